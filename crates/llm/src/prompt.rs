//! Prompt building for narrative enrichment

use std::fmt;

use arn_assistant_core::EnrichmentContext;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Upper bound on the serialized data block, in graphemes
const MAX_DATA_GRAPHEMES: usize = 4000;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Prompt builder for the ARN analytics assistant
#[derive(Debug, Default)]
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyst persona for the regulator's observatory
    pub fn system_prompt(mut self) -> Self {
        let system = r#"Você é um analista do Observatório do Mercado de Telecomunicações da Guiné-Bissau (ARN - Autoridade Reguladora Nacional).

## Instruções
- Responda sempre em português, de forma concisa e profissional.
- Baseie a análise apenas nos dados JSON fornecidos. Não invente números.
- Mantenha os valores exatamente como aparecem na resposta de base.
- Destaque tendências, líderes de mercado e variações relevantes.
- Não use mais de três parágrafos curtos."#;

        self.messages.push(Message::system(system));
        self
    }

    /// Add the question, the deterministic answer and its data
    pub fn with_context(mut self, context: &EnrichmentContext) -> Self {
        let data = serde_json::to_string_pretty(&context.data).unwrap_or_default();
        let data = truncate_graphemes(&data, MAX_DATA_GRAPHEMES);

        let user = format!(
            "Pergunta: {question}\n\nIntenção detectada: {intent}\n\n\
             Resposta de base:\n{answer}\n\nDados:\n```json\n{data}\n```\n\n\
             Reescreva a resposta de base como uma análise breve e informativa.",
            question = context.question.trim(),
            intent = context.intent,
            answer = context.local_answer,
            data = data,
        );

        self.messages.push(Message::user(user));
        self
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}

fn truncate_graphemes(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
