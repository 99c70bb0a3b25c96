//! Fallback Orchestration
//!
//! Runs one utterance through the pipeline and picks the final answer:
//!
//! 1. Greeting/farewell: canned reply, nothing else runs
//! 2. Local answer: classify, extract, aggregate, synthesize
//! 3. Enriched answer: optional single narrative attempt under a hard
//!    timeout; replaces only the text, never the data or charts
//! 4. Canned fallback: guidance for unrecognized questions, a topic apology
//!    for data failures
//!
//! Every path ends in a reply; only empty input is rejected.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arn_assistant_config::Settings;
use arn_assistant_core::{
    ChartDescriptor, Clock, ConversationTurn, EnrichmentContext, IntentDefinition, NarrativeEnricher,
    RegulatoryDataSource, SessionRepository, TurnRole,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::QueryCache;
use crate::dispatcher::{AggregationDispatcher, DataQueryError};
use crate::entities::EntityExtractor;
use crate::intent::{Classification, IntentClassifier, IntentRegistry};
use crate::session::{Session, SessionManager, SessionOptions};
use crate::synthesizer::{ResponseSynthesizer, SynthesizedResponse};
use crate::AssistantError;

/// Inbound utterance
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub owner: Option<String>,
}

impl SubmitRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Which tier produced the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseTier {
    SmallTalk,
    Local,
    Enriched,
    Fallback,
}

impl ResponseTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseTier::SmallTalk => "small_talk",
            ResponseTier::Local => "local",
            ResponseTier::Enriched => "enriched",
            ResponseTier::Fallback => "fallback",
        }
    }
}

/// Reply to a submitted utterance
#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub response_text: String,
    pub session_id: String,
    pub detected_intent: String,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Value>,
    pub chart_descriptors: Vec<ChartDescriptor>,
    pub followups: Vec<String>,
    pub latency_ms: u64,
    pub tier: ResponseTier,
}

/// Greeting text and starter suggestions for a fresh conversation
#[derive(Debug, Clone, Serialize)]
pub struct WelcomePayload {
    pub text: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetReply {
    pub acknowledged: bool,
    pub session_id: String,
    pub welcome: WelcomePayload,
}

/// One turn as returned by history retrieval
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl From<ConversationTurn> for HistoryEntry {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            role: turn.role,
            text: turn.text,
            timestamp: turn.timestamp,
            intent: turn.intent,
            confidence: turn.confidence,
        }
    }
}

/// Outcome of one fallback tier
#[derive(Debug)]
enum TierOutcome<T> {
    Success(T),
    Skip(&'static str),
    Fail(&'static str),
}

/// When and how Tier 1 runs
#[derive(Debug, Clone)]
pub struct EnrichmentPolicy {
    pub enabled: bool,
    pub timeout: Duration,
    /// Replies shorter than this are trivial and discarded
    pub min_chars: usize,
}

/// Answer before it is recorded
struct Answer {
    intent: String,
    confidence: f32,
    response: SynthesizedResponse,
    data: Option<Value>,
    tier: ResponseTier,
}

/// Conversational analytics assistant
pub struct Assistant {
    classifier: IntentClassifier,
    extractor: EntityExtractor,
    dispatcher: AggregationDispatcher,
    synthesizer: ResponseSynthesizer,
    sessions: Arc<SessionManager>,
    enricher: Option<Arc<dyn NarrativeEnricher>>,
    policy: EnrichmentPolicy,
    clock: Arc<dyn Clock>,
}

impl Assistant {
    /// Wire the pipeline from settings and collaborators
    pub fn new(
        settings: &Settings,
        source: Arc<dyn RegulatoryDataSource>,
        repository: Arc<dyn SessionRepository>,
        enricher: Option<Arc<dyn NarrativeEnricher>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AssistantError> {
        let registry = Arc::new(IntentRegistry::new(settings.intents.clone())?);
        let classifier = IntentClassifier::new(registry, settings.classifier.calibration);
        let extractor = EntityExtractor::new(&settings.operators)?;

        let cache = Arc::new(QueryCache::new(
            Arc::clone(&clock),
            Duration::from_secs(settings.cache.ttl_seconds),
        ));
        let dispatcher = AggregationDispatcher::new(
            source,
            cache,
            Arc::clone(&clock),
            settings.operators.clone(),
        );
        let synthesizer = ResponseSynthesizer::new(
            settings.templates.clone(),
            settings.operators.clone(),
            &settings.synthesis,
        );
        let sessions = Arc::new(SessionManager::new(
            repository,
            Arc::clone(&clock),
            SessionOptions::from(&settings.session),
            settings.templates.system_context.clone(),
        ));

        let policy = EnrichmentPolicy {
            enabled: settings.enrichment.enabled && enricher.is_some(),
            timeout: Duration::from_millis(settings.enrichment.timeout_ms),
            min_chars: settings.enrichment.min_chars,
        };

        tracing::info!(
            intents = settings.intents.len(),
            enrichment = policy.enabled,
            "Assistant initialized"
        );

        Ok(Self {
            classifier,
            extractor,
            dispatcher,
            synthesizer,
            sessions,
            enricher,
            policy,
            clock,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        self.dispatcher.cache()
    }

    pub fn registry(&self) -> &Arc<IntentRegistry> {
        self.classifier.registry()
    }

    /// Answer an utterance and record both turns in its session
    pub async fn submit(&self, request: SubmitRequest) -> Result<AssistantReply, AssistantError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(AssistantError::Input(self.synthesizer.validation().to_string()));
        }

        let started = Instant::now();
        let session = self
            .sessions
            .resolve(request.session_id.as_deref(), request.owner.clone())
            .await;
        let _guard = session.lock_requests().await;

        let user_turn = ConversationTurn::new(&session.id, TurnRole::User, text, self.clock.now());
        self.sessions.record_turn(&session, user_turn).await;

        let answer = self.answer(text).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let assistant_turn = ConversationTurn::new(
            &session.id,
            TurnRole::Assistant,
            &answer.response.text,
            self.clock.now(),
        )
        .with_intent(&answer.intent, answer.confidence)
        .with_data(answer.data.clone())
        .with_latency(latency_ms);
        self.sessions.record_turn(&session, assistant_turn).await;

        metrics::counter!(
            "arn_requests_total",
            "intent" => answer.intent.clone(),
            "tier" => answer.tier.as_str()
        )
        .increment(1);
        metrics::histogram!("arn_pipeline_latency_ms").record(latency_ms as f64);

        tracing::info!(
            session_id = %session.id,
            intent = %answer.intent,
            confidence = answer.confidence,
            tier = answer.tier.as_str(),
            latency_ms,
            "Answered utterance"
        );

        Ok(AssistantReply {
            response_text: answer.response.text,
            session_id: session.id.clone(),
            detected_intent: answer.intent,
            confidence: answer.confidence,
            structured_data: answer.data,
            chart_descriptors: answer.response.charts,
            followups: answer.response.followups,
            latency_ms,
            tier: answer.tier,
        })
    }

    async fn answer(&self, text: &str) -> Answer {
        if let Some(small_talk) = self.classifier.detect_small_talk(text) {
            return self.small_talk(&small_talk);
        }

        let classification = self.classifier.classify(text);
        let (intent, confidence) = match &classification {
            Classification::Unrecognized => return self.fallback(&classification, None),
            c if c.is_small_talk() => return self.small_talk(c),
            c => (c.intent().to_string(), c.confidence()),
        };

        let definition = match self.classifier.registry().get(&intent) {
            Some(definition) if AggregationDispatcher::supports(&intent) => definition,
            _ => return self.fallback(&classification, None),
        };

        let slots = self
            .extractor
            .extract(text, &definition.expected_slots, self.clock.current_year());

        let result = match self.dispatcher.dispatch(&intent, &slots).await {
            Ok(result) => result,
            Err(err) => {
                let apology = self.synthesizer.synthesize(&definition, &slots, Err(&err));
                return self.fallback(&classification, Some((apology, err)));
            }
        };

        let mut response = self.synthesizer.synthesize(&definition, &slots, Ok(&result));
        let data = serde_json::to_value(&result).ok();

        let tier = match self
            .enrich(text, &definition, confidence, &response.text, result.has_data(), data.as_ref())
            .await
        {
            TierOutcome::Success(narrative) => {
                response.text = narrative;
                ResponseTier::Enriched
            }
            TierOutcome::Skip(reason) => {
                tracing::debug!(intent = %intent, reason, "Enrichment skipped");
                ResponseTier::Local
            }
            TierOutcome::Fail(reason) => {
                metrics::counter!("arn_enrichment_failures_total", "reason" => reason).increment(1);
                ResponseTier::Local
            }
        };

        Answer {
            intent,
            confidence,
            response,
            data,
            tier,
        }
    }

    /// Tier 1: a single attempt under the hard timeout
    async fn enrich(
        &self,
        question: &str,
        definition: &IntentDefinition,
        confidence: f32,
        local_answer: &str,
        has_data: bool,
        data: Option<&Value>,
    ) -> TierOutcome<String> {
        let enricher = match (&self.enricher, self.policy.enabled) {
            (Some(enricher), true) => enricher,
            _ => return TierOutcome::Skip("disabled"),
        };
        let data = match data {
            Some(data) if has_data => data.clone(),
            _ => return TierOutcome::Skip("no_data"),
        };
        if confidence < definition.min_confidence {
            return TierOutcome::Skip("low_confidence");
        }

        let context = EnrichmentContext {
            question: question.to_string(),
            intent: definition.name.clone(),
            local_answer: local_answer.to_string(),
            data,
        };

        match tokio::time::timeout(self.policy.timeout, enricher.enrich(&context)).await {
            Err(_) => {
                tracing::warn!(
                    enricher = enricher.name(),
                    timeout_ms = self.policy.timeout.as_millis() as u64,
                    "Enrichment timed out"
                );
                TierOutcome::Fail("timeout")
            }
            Ok(Err(e)) => {
                tracing::warn!(enricher = enricher.name(), error = %e, "Enrichment failed");
                TierOutcome::Fail("error")
            }
            Ok(Ok(narrative)) => {
                let narrative = narrative.trim();
                if narrative.chars().count() < self.policy.min_chars {
                    TierOutcome::Skip("trivial")
                } else {
                    TierOutcome::Success(narrative.to_string())
                }
            }
        }
    }

    fn small_talk(&self, classification: &Classification) -> Answer {
        let intent = classification.intent().to_string();
        let text = self.synthesizer.small_talk(&intent);
        Answer {
            intent,
            confidence: classification.confidence(),
            response: SynthesizedResponse {
                text,
                charts: Vec::new(),
                followups: Vec::new(),
            },
            data: None,
            tier: ResponseTier::SmallTalk,
        }
    }

    /// Tier 2: guidance, or the apology for a failed data query
    fn fallback(
        &self,
        classification: &Classification,
        failure: Option<(SynthesizedResponse, DataQueryError)>,
    ) -> Answer {
        let response = match failure {
            Some((apology, DataQueryError::Source { .. } | DataQueryError::Encoding(_))) => {
                SynthesizedResponse {
                    followups: self.synthesizer.starter_suggestions(),
                    ..apology
                }
            }
            _ => self.synthesizer.guidance(),
        };

        Answer {
            intent: classification.intent().to_string(),
            confidence: classification.confidence(),
            response,
            data: None,
            tier: ResponseTier::Fallback,
        }
    }

    /// Reset a session's window, or mint a session, and return the welcome
    pub async fn reset(&self, session_id: Option<&str>, owner: Option<String>) -> ResetReply {
        let session: Arc<Session> = self.sessions.reset(session_id, owner).await;
        ResetReply {
            acknowledged: true,
            session_id: session.id.clone(),
            welcome: self.welcome(),
        }
    }

    pub fn welcome(&self) -> WelcomePayload {
        WelcomePayload {
            text: self.synthesizer.welcome().to_string(),
            suggestions: self.synthesizer.starter_suggestions(),
        }
    }

    /// Ordered turns, most recent last
    pub async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, AssistantError> {
        let turns = self.sessions.history(session_id, limit).await?;
        Ok(turns.into_iter().map(HistoryEntry::from).collect())
    }

    pub async fn end(&self, session_id: &str) -> bool {
        self.sessions.end(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::{test_clock, CountingSource};
    use crate::session::InMemorySessionRepository;
    use arn_assistant_core::{EnrichmentError, SlotValue, Slots};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SCENARIO_A: &str = "Quantos assinantes tem a Orange em 2023?";
    /// Three matcher hits, so confidence clears the enrichment threshold
    const CONFIDENT: &str = "Quantos assinantes e clientes tem a Orange em 2023?";

    enum Script {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct ScriptedEnricher {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedEnricher {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NarrativeEnricher for ScriptedEnricher {
        async fn enrich(&self, _context: &EnrichmentContext) -> Result<String, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Reply(text) => Ok(text.to_string()),
                Script::Fail => Err(EnrichmentError::Status(503)),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok("tarde demais".to_string())
                }
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn assistant_with(
        source: Arc<CountingSource>,
        enricher: Option<Arc<dyn NarrativeEnricher>>,
    ) -> Assistant {
        let mut settings = Settings::default();
        settings.enrichment.enabled = enricher.is_some();
        settings.enrichment.timeout_ms = 50;

        Assistant::new(
            &settings,
            source,
            Arc::new(InMemorySessionRepository::new()),
            enricher,
            test_clock(),
        )
        .unwrap()
    }

    fn assistant(source: Arc<CountingSource>) -> Assistant {
        assistant_with(source, None)
    }

    #[tokio::test]
    async fn test_subscriber_question_answered_locally() {
        let source = Arc::new(CountingSource::new());
        let assistant = assistant(source.clone());

        let reply = assistant.submit(SubmitRequest::new(SCENARIO_A)).await.unwrap();

        assert_eq!(reply.detected_intent, "subscriber_query");
        assert!(reply.confidence > 0.0);
        assert!(reply.response_text.contains("2023"));
        assert!(reply.response_text.contains("Orange"));
        assert!(reply.response_text.contains("1.400.000"));
        assert_eq!(reply.tier, ResponseTier::Local);
        assert!(reply.structured_data.is_some());
        assert!(!reply.chart_descriptors.is_empty());
        assert!(reply.followups.len() <= 4);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_greeting_short_circuits() {
        let source = Arc::new(CountingSource::new());
        let assistant = assistant(source.clone());

        let reply = assistant.submit(SubmitRequest::new("ola")).await.unwrap();

        assert_eq!(reply.detected_intent, "greeting");
        assert!(reply.confidence >= 0.8);
        assert_eq!(reply.tier, ResponseTier::SmallTalk);
        assert!(Settings::default()
            .templates
            .greetings
            .contains(&reply.response_text));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_repeated_question_hits_cache() {
        let source = Arc::new(CountingSource::new());
        let assistant = assistant(source.clone());
        let slots = Slots::new()
            .with("operator", SlotValue::Operator("ORANGE".into()))
            .with("year", SlotValue::Year(2023));
        let key = QueryCache::key("subscriber_query", &slots);

        let first = assistant.submit(SubmitRequest::new(SCENARIO_A)).await.unwrap();
        let hits_before = assistant.cache().entry_hits(&key).unwrap();

        let second = assistant
            .submit(SubmitRequest::new(SCENARIO_A).in_session(&first.session_id))
            .await
            .unwrap();

        assert_eq!(assistant.cache().entry_hits(&key).unwrap(), hits_before + 1);
        assert_eq!(source.calls(), 1);
        assert_eq!(first.structured_data, second.structured_data);
        assert_eq!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let assistant = assistant(Arc::new(CountingSource::new()));
        let reply = assistant.submit(SubmitRequest::new(SCENARIO_A)).await.unwrap();
        assert_eq!(assistant.history(&reply.session_id, None).await.unwrap().len(), 2);

        let reset = assistant.reset(Some(&reply.session_id), None).await;

        assert!(reset.acknowledged);
        assert_eq!(reset.session_id, reply.session_id);
        assert!(!reset.welcome.suggestions.is_empty());
        assert!(assistant.history(&reply.session_id, None).await.unwrap().is_empty());

        let session = assistant.sessions().get(&reply.session_id).unwrap();
        assert_eq!(session.window().turns().len(), 1);
    }

    #[tokio::test]
    async fn test_session_is_not_shared_across_owners() {
        let assistant = assistant(Arc::new(CountingSource::new()));
        let first = assistant
            .submit(SubmitRequest {
                owner: Some("ana@arn.gw".into()),
                ..SubmitRequest::new(SCENARIO_A)
            })
            .await
            .unwrap();

        let other = assistant
            .submit(SubmitRequest {
                owner: Some("rui@arn.gw".into()),
                ..SubmitRequest::new("ola").in_session(&first.session_id)
            })
            .await
            .unwrap();

        assert_ne!(other.session_id, first.session_id);
        assert_eq!(assistant.history(&first.session_id, None).await.unwrap().len(), 2);
        assert_eq!(assistant.history(&other.session_id, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_user_turn_recorded_before_assistant_turn() {
        let assistant = assistant(Arc::new(CountingSource::new()));
        let reply = assistant.submit(SubmitRequest::new(SCENARIO_A)).await.unwrap();

        let history = assistant.history(&reply.session_id, None).await.unwrap();
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].text, SCENARIO_A);
        assert_eq!(history[1].role, TurnRole::Assistant);
        assert_eq!(history[1].intent.as_deref(), Some("subscriber_query"));
        assert_eq!(history[1].text, reply.response_text);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let source = Arc::new(CountingSource::new());
        let assistant = assistant(source.clone());

        let err = assistant.submit(SubmitRequest::new("   ")).await.unwrap_err();

        assert!(matches!(err, AssistantError::Input(_)));
        assert_eq!(assistant.sessions().count(), 0);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_gets_guidance() {
        let assistant = assistant(Arc::new(CountingSource::new()));
        let reply = assistant.submit(SubmitRequest::new("xyz abc")).await.unwrap();

        assert_eq!(reply.detected_intent, "unrecognized");
        assert_eq!(reply.confidence, 0.0);
        assert_eq!(reply.tier, ResponseTier::Fallback);
        assert!(reply.response_text.contains("Posso ajudar com informações sobre"));
    }

    #[tokio::test]
    async fn test_data_failure_gets_apology() {
        let assistant = assistant(Arc::new(CountingSource::failing()));
        let reply = assistant.submit(SubmitRequest::new(SCENARIO_A)).await.unwrap();

        assert_eq!(reply.tier, ResponseTier::Fallback);
        assert_eq!(reply.detected_intent, "subscriber_query");
        assert!(reply.response_text.starts_with("Desculpe"));
        assert!(reply.response_text.contains("assinantes"));
        assert!(!reply.response_text.contains("connection refused"));
        assert!(reply.structured_data.is_none());
    }

    #[tokio::test]
    async fn test_enrichment_replaces_text_only() {
        let narrative = "A Orange manteve a liderança em 2023 com cerca de dois terços dos assinantes do mercado.";
        let local = assistant(Arc::new(CountingSource::new()))
            .submit(SubmitRequest::new(CONFIDENT))
            .await
            .unwrap();

        let enricher = ScriptedEnricher::new(Script::Reply(narrative));
        let assistant = assistant_with(Arc::new(CountingSource::new()), Some(enricher.clone()));
        let reply = assistant.submit(SubmitRequest::new(CONFIDENT)).await.unwrap();

        assert_eq!(reply.tier, ResponseTier::Enriched);
        assert_eq!(reply.response_text, narrative);
        assert_eq!(reply.structured_data, local.structured_data);
        assert_eq!(reply.chart_descriptors, local.chart_descriptors);
        assert_eq!(enricher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enrichment_timeout_keeps_local_answer() {
        let local = assistant(Arc::new(CountingSource::new()))
            .submit(SubmitRequest::new(CONFIDENT))
            .await
            .unwrap();

        let enricher = ScriptedEnricher::new(Script::Hang);
        let assistant = assistant_with(Arc::new(CountingSource::new()), Some(enricher.clone()));
        let reply = assistant.submit(SubmitRequest::new(CONFIDENT)).await.unwrap();

        assert_eq!(reply.tier, ResponseTier::Local);
        assert_eq!(reply.response_text, local.response_text);
        assert_eq!(enricher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enrichment_error_keeps_local_answer() {
        let local = assistant(Arc::new(CountingSource::new()))
            .submit(SubmitRequest::new(CONFIDENT))
            .await
            .unwrap();

        let enricher = ScriptedEnricher::new(Script::Fail);
        let assistant = assistant_with(Arc::new(CountingSource::new()), Some(enricher.clone()));
        let reply = assistant.submit(SubmitRequest::new(CONFIDENT)).await.unwrap();

        assert_eq!(reply.tier, ResponseTier::Local);
        assert_eq!(reply.response_text, local.response_text);
    }

    #[tokio::test]
    async fn test_trivial_enrichment_is_discarded() {
        let enricher = ScriptedEnricher::new(Script::Reply("Ok."));
        let assistant = assistant_with(Arc::new(CountingSource::new()), Some(enricher));
        let reply = assistant.submit(SubmitRequest::new(CONFIDENT)).await.unwrap();

        assert_eq!(reply.tier, ResponseTier::Local);
        assert!(reply.response_text.starts_with("Em 2023, Orange tinha"));
    }

    #[tokio::test]
    async fn test_low_confidence_skips_enrichment() {
        let enricher = ScriptedEnricher::new(Script::Reply("nunca usado"));
        let assistant = assistant_with(Arc::new(CountingSource::new()), Some(enricher.clone()));

        // two matcher hits: 0.67 is below the 0.7 threshold
        let reply = assistant.submit(SubmitRequest::new(SCENARIO_A)).await.unwrap();

        assert_eq!(reply.tier, ResponseTier::Local);
        assert_eq!(enricher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_session_is_replaced() {
        let assistant = assistant(Arc::new(CountingSource::new()));
        let reply = assistant
            .submit(SubmitRequest::new("ola").in_session("does-not-exist"))
            .await
            .unwrap();

        assert_ne!(reply.session_id, "does-not-exist");
        assert!(assistant.sessions().get(&reply.session_id).is_some());
    }
}
