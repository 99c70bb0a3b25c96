//! Default intent catalog
//!
//! Registry order matters: when two intents score the same, the one listed
//! first wins.

use arn_assistant_core::{IntentCategory, IntentDefinition, MatcherSpec};

fn patterns(sources: &[&str]) -> Vec<MatcherSpec> {
    sources.iter().map(|s| MatcherSpec::pattern(*s)).collect()
}

fn keywords(sources: &[&str]) -> Vec<MatcherSpec> {
    sources.iter().map(|s| MatcherSpec::keyword(*s)).collect()
}

/// Built-in intents used when the configuration does not provide any
pub fn default_intents() -> Vec<IntentDefinition> {
    vec![
        IntentDefinition::new("subscriber_query")
            .with_topic("assinantes")
            .with_matchers(patterns(&[
                r"\b(assinantes?|clientes?|utilizadores?|estações?|quantos?)\b",
                r"\b(número|total|quantidade)\s+(de\s+)?(assinantes?|clientes?)\b",
                r"\b(assinantes?\s+(activos?|ativos?|móveis?|fixos?))\b",
            ]))
            .with_slots(&["operator", "year", "quarter", "month"])
            .with_template("Em {year}, {subject} tinha {total} assinantes{share_clause}.{breakdown}")
            .with_followups(&[
                "Qual a quota de mercado da {operator} em {year}?",
                "Compare assinantes entre operadoras em {year}",
                "Mostre a evolução de assinantes",
                "Qual a receita total de {year}?",
                "Qual operadora cresceu mais em {year}?",
            ]),
        IntentDefinition::new("traffic_analysis")
            .with_topic("tráfego")
            .with_matchers(patterns(&[
                r"\b(tráfego|trafego|chamadas?|minutos?|voz)\b",
                r"\b(volume\s+de\s+)?(chamadas?|tráfego)\b",
                r"\b(on-net|off-net|internacional)\b",
            ]))
            .with_slots(&["operator", "year", "quarter", "month"])
            .with_template(
                "Análise de tráfego de voz em {year}{scope}:\n\n\
                 Volume total: {total} minutos\n\n\
                 Distribuição por tipo:\n\
                 • On-Net: {on_net_pct}% ({on_net} min)\n\
                 • Off-Net: {off_net_pct}% ({off_net} min)\n\
                 • Internacional: {international_pct}% ({international} min)",
            )
            .with_followups(&[
                "Compare o tráfego da Orange e TELECEL em {year}",
                "Quantos assinantes tem a {operator} em {year}?",
                "Como evoluiu o tráfego nos últimos anos?",
                "Qual a receita total de {year}?",
            ]),
        IntentDefinition::new("market_share")
            .with_topic("quota de mercado")
            .with_matchers(patterns(&[
                r"\b(quota|market\s+share|percentagem|domínio|liderança)\b",
                r"\b(participação\s+no\s+mercado)\b",
                r"\b(maior\s+operadora|líder\s+do\s+mercado)\b",
            ]))
            .with_slots(&["operator", "year"])
            .with_template(
                "Quota de mercado das operadoras em {year}:\n{breakdown}\n\n\
                 A {leader} é líder de mercado com {leader_share}% de quota.",
            )
            .with_followups(&[
                "Quantos assinantes tem a {operator} em {year}?",
                "Compare TELECEL e Orange em receitas",
                "Como evoluiu o número de assinantes?",
            ]),
        IntentDefinition::new("revenue")
            .with_topic("receitas")
            .with_matchers(patterns(&[
                r"\b(receitas?|faturamento|volume\s+de\s+negócios|fcfa)\b",
                r"\b(lucros?|ganhos?|rendimentos?)\b",
            ]))
            .with_slots(&["operator", "year", "quarter", "month"])
            .with_template(
                "Receitas do setor de telecomunicações em {year}{scope}:\n\n\
                 Volume total: {total} milhões FCFA\n\
                 Média trimestral: {quarterly_average} milhões FCFA{growth}{breakdown}",
            )
            .with_followups(&[
                "Qual a receita da {operator} em {year}?",
                "Compare receitas da TELECEL e Orange em {year}",
                "Como evoluíram as receitas?",
                "Qual a quota de mercado em {year}?",
            ]),
        IntentDefinition::new("investment")
            .with_topic("investimento")
            .with_matchers(patterns(&[
                r"\b(investimentos?|investiu|capex|infraestrutura|gastos)\b",
                r"\b(aplicação\s+de\s+capital)\b",
            ]))
            .with_slots(&["operator", "year"])
            .with_template(
                "Investimento no setor em {year}{scope}: {total} milhões FCFA \
                 ({tangible} milhões em ativos corpóreos e {intangible} milhões em incorpóreos).{breakdown}",
            )
            .with_followups(&[
                "Quanto investiu a {operator} em {year}?",
                "Quantos empregos havia no setor em {year}?",
                "Como evoluiu o investimento?",
            ]),
        IntentDefinition::new("employment")
            .with_topic("emprego")
            .with_matchers(patterns(&[
                r"\b(empregos?|funcionários|trabalhadores|pessoal|rh)\b",
                r"\b(postos\s+de\s+trabalho)\b",
            ]))
            .with_slots(&["operator", "year"])
            .with_template(
                "Emprego no setor em {year}{scope}: {total} postos de trabalho \
                 ({direct} diretos e {indirect} indiretos).{breakdown}",
            )
            .with_followups(&[
                "Quantos trabalhadores tem a {operator} em {year}?",
                "Quanto investiu o setor em {year}?",
            ]),
        IntentDefinition::new("operator_comparison")
            .with_topic("comparação entre operadoras")
            .with_matchers(patterns(&[
                r"\b(comparar|compare|versus|vs|diferença|melhor|maior|contra)\b",
                r"\b(telecel\s+(vs|versus|contra)\s+orange)\b",
                r"\b(qual\s+é\s+(melhor|maior))\b",
            ]))
            .with_slots(&["operator", "second_operator", "year"])
            .with_template(
                "Comparação {first} vs {second} em {year}:\n\n\
                 Assinantes:\n• {first}: {first_subscribers}\n• {second}: {second_subscribers}\n{subscriber_gap}\n\n\
                 Receitas:\n• {first}: {first_revenue} M FCFA\n• {second}: {second_revenue} M FCFA\n\n\
                 Tráfego:\n• {first}: {first_traffic} min\n• {second}: {second_traffic} min",
            )
            .with_followups(&[
                "Qual a quota de mercado em {year}?",
                "Compare o tráfego da Orange e TELECEL em {year}",
                "Como evoluíram as receitas?",
            ]),
        IntentDefinition::new("trends")
            .with_topic("tendências")
            .with_matchers(patterns(&[
                r"\b(tendência|evolução|evoluiu|evoluíram|crescimento|queda|variação|histórico)\b",
                r"\b(como\s+evoluiu|está\s+crescendo)\b",
            ]))
            .with_slots(&["operator", "metric", "year"])
            .with_min_confidence(0.6)
            .with_template(
                "Evolução de {metric}{scope} entre {start_year} e {end_year}: tendência {direction} \
                 ({slope} por ano, confiança {confidence}%).\n\
                 Projeção para {next_year}: {projection} (entre {lower} e {upper}).",
            )
            .with_followups(&[
                "Qual a quota de mercado da {operator}?",
                "Compare TELECEL e Orange em {year}",
                "Qual a receita total de {year}?",
            ]),
        IntentDefinition::new("greeting")
            .with_category(IntentCategory::SmallTalk)
            .with_matchers(keywords(&[
                "ola", "olá", "oi", "bom dia", "boa tarde", "boa noite", "boas", "hey", "hi", "hello",
            ]))
            .with_min_confidence(0.8),
        IntentDefinition::new("farewell")
            .with_category(IntentCategory::SmallTalk)
            .with_matchers(keywords(&[
                "tchau", "adeus", "até logo", "obrigado", "obrigada", "valeu", "bye",
            ]))
            .with_min_confidence(0.8),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_unique() {
        let intents = default_intents();
        let names: HashSet<_> = intents.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names.len(), intents.len());
        assert_eq!(intents[0].name, "subscriber_query");
    }

    #[test]
    fn test_small_talk_intents() {
        let intents = default_intents();
        let small_talk: Vec<_> = intents
            .iter()
            .filter(|i| i.is_small_talk())
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(small_talk, vec!["greeting", "farewell"]);
    }

    #[test]
    fn test_data_intents_have_templates() {
        for intent in default_intents().iter().filter(|i| !i.is_small_talk()) {
            assert!(!intent.response_template.is_empty(), "{}", intent.name);
            assert!(!intent.topic.is_empty(), "{}", intent.name);
            assert!(intent.expects("year"), "{}", intent.name);
        }
    }
}
