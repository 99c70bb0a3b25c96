//! Canned Portuguese response texts

use serde::{Deserialize, Serialize};

/// Response texts that do not come from an intent template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Canned greetings, one is picked per greeting
    #[serde(default = "default_greetings")]
    pub greetings: Vec<String>,

    #[serde(default = "default_farewells")]
    pub farewells: Vec<String>,

    /// Framing text placed at the head of every working window
    #[serde(default = "default_system_context")]
    pub system_context: String,

    #[serde(default = "default_welcome")]
    pub welcome: String,

    #[serde(default = "default_starter_suggestions")]
    pub starter_suggestions: Vec<String>,

    /// Fallback for unrecognized questions
    #[serde(default = "default_guidance")]
    pub guidance: String,

    /// Data failure message, `{topic}` is the intent's topic
    #[serde(default = "default_apology")]
    pub apology: String,

    /// Answer when the dataset has no rows; `{topic}`, `{scope}` (named operator) and `{year}` are substituted
    #[serde(default = "default_no_data")]
    pub no_data: String,

    /// Empty question
    #[serde(default = "default_validation")]
    pub validation: String,
}

fn default_greetings() -> Vec<String> {
    vec![
        "Olá! Como posso ajudar com informações sobre o mercado de telecomunicações da Guiné-Bissau?".to_string(),
        "Oi! Em que posso ser útil hoje sobre as telecomunicações na Guiné-Bissau?".to_string(),
        "Boas! Precisa de alguma informação específica do Observatório?".to_string(),
    ]
}

fn default_farewells() -> Vec<String> {
    vec![
        "Obrigado por usar o Assistente ARN! Foi um prazer ajudar com os dados de telecomunicações. Até breve!".to_string(),
    ]
}

fn default_system_context() -> String {
    "Você é o Assistente ARN Analytics do Observatório do Mercado de Telecomunicações da \
     Guiné-Bissau. Responda em português, de forma concisa e com base nos dados do observatório."
        .to_string()
}

fn default_welcome() -> String {
    "Olá! Sou o Assistente ARN Analytics. Posso ajudar você com dados sobre o mercado de \
     telecomunicações da Guiné-Bissau."
        .to_string()
}

fn default_starter_suggestions() -> Vec<String> {
    vec![
        "Qual a quota de mercado da Orange?".to_string(),
        "Mostre os dados de assinantes de 2023".to_string(),
        "Compare TELECEL e Orange em receitas".to_string(),
        "Como evoluiu o tráfego nos últimos anos?".to_string(),
    ]
}

fn default_guidance() -> String {
    "Desculpe, não entendi sua pergunta. Posso ajudar com informações sobre:\n\n\
     • Assinantes e estações móveis\n\
     • Receitas e faturamento\n\
     • Tráfego de voz\n\
     • Quota de mercado das operadoras\n\
     • Investimento e emprego no setor\n\
     • Comparações e tendências\n\n\
     Tente reformular sua pergunta."
        .to_string()
}

fn default_apology() -> String {
    "Desculpe, não foi possível obter os dados de {topic} neste momento. Tente novamente mais tarde."
        .to_string()
}

fn default_no_data() -> String {
    "Não encontrei dados de {topic}{scope} para {year}.".to_string()
}

fn default_validation() -> String {
    "Por favor, escreva uma pergunta.".to_string()
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            greetings: default_greetings(),
            farewells: default_farewells(),
            system_context: default_system_context(),
            welcome: default_welcome(),
            starter_suggestions: default_starter_suggestions(),
            guidance: default_guidance(),
            apology: default_apology(),
            no_data: default_no_data(),
            validation: default_validation(),
        }
    }
}
