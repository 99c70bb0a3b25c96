//! HTTP Endpoints
//!
//! REST API for the analytics assistant.

use std::time::Duration;

use arn_assistant_agent::{AssistantReply, HistoryEntry, ResetReply, SubmitRequest};
use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.timeout_seconds.max(1));

    Router::new()
        // Conversation
        .route("/api/chat", post(chat))
        .route("/api/sessions/reset", post(reset_session))
        .route("/api/sessions/:id/history", get(session_history))
        .route("/api/sessions/:id", delete(end_session))

        // Introspection
        .route("/api/intents", get(list_intents))
        .route("/api/cache/stats", get(cache_stats))

        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))

        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer from configured origins
///
/// Disabled CORS is permissive; no valid origin falls back to localhost:3000.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to {}", DEFAULT_ORIGIN);
        return layer.allow_origin(HeaderValue::from_static(DEFAULT_ORIGIN));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

/// Submit an utterance
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<AssistantReply>, ServerError> {
    let reply = state.assistant.submit(request).await?;
    Ok(Json(reply))
}

#[derive(Debug, Default, Deserialize)]
struct ResetRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    owner: Option<String>,
}

/// Start over, keeping the session id when it is still live
///
/// The body is optional; without one a fresh session is started.
async fn reset_session(
    State(state): State<AppState>,
    body: Option<Json<ResetRequest>>,
) -> Json<ResetReply> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let reply = state
        .assistant
        .reset(request.session_id.as_deref(), request.owner)
        .await;
    Json(reply)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    session_id: String,
    turns: Vec<HistoryEntry>,
}

async fn session_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let turns = state.assistant.history(&id, query.limit).await?;
    Ok(Json(HistoryResponse {
        session_id: id,
        turns,
    }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.assistant.end(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(format!("Unknown session: {}", id)))
    }
}

/// Active intent catalog
async fn list_intents(State(state): State<AppState>) -> Json<serde_json::Value> {
    let intents: Vec<serde_json::Value> = state
        .assistant
        .registry()
        .active()
        .into_iter()
        .map(|i| {
            serde_json::json!({
                "name": i.name,
                "category": i.category,
                "topic": i.topic,
                "expected_slots": i.expected_slots,
                "min_confidence": i.min_confidence,
            })
        })
        .collect();

    Json(serde_json::json!({
        "count": intents.len(),
        "intents": intents,
    }))
}

async fn cache_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.assistant.cache().stats())
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "sessions": state.assistant.sessions().count(),
        "cache_entries": state.assistant.cache().len(),
        "enrichment": state.config.enrichment.enabled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{IndicatorRecord, InMemoryDataSource};
    use arn_assistant_config::Settings;
    use arn_assistant_core::{fields, DataDomain};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let source = InMemoryDataSource::new(vec![
            IndicatorRecord::new(DataDomain::Subscribers, "ORANGE", 2023)
                .with(fields::PREPAID, 900_000.0)
                .with(fields::POSTPAID, 100_000.0),
            IndicatorRecord::new(DataDomain::Subscribers, "TELECEL", 2023)
                .with(fields::PREPAID, 500_000.0),
        ])
        .unwrap();

        AppState::build(Settings::default(), Arc::new(source), None).unwrap()
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn ask(state: &AppState, text: &str) -> serde_json::Value {
        let (status, body) = send(state, post_json("/api/chat", serde_json::json!({ "text": text }))).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&test_state(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_chat_answers_subscriber_question() {
        let state = test_state();
        let body = ask(&state, "Quantos assinantes tem a Orange em 2023?").await;

        assert_eq!(body["detected_intent"], "subscriber_query");
        assert_eq!(body["tier"], "local");
        assert!(body["session_id"].as_str().is_some_and(|s| !s.is_empty()));
        let text = body["response_text"].as_str().unwrap();
        assert!(text.contains("Orange"));
        assert!(text.contains("1.000.000"));
        assert!(body["chart_descriptors"].as_array().is_some_and(|c| !c.is_empty()));
    }

    #[tokio::test]
    async fn test_chat_reports_missing_operator_data() {
        let source = InMemoryDataSource::new(vec![IndicatorRecord::new(
            DataDomain::Subscribers,
            "TELECEL",
            2023,
        )
        .with(fields::PREPAID, 500_000.0)])
        .unwrap();
        let state = AppState::build(Settings::default(), Arc::new(source), None).unwrap();

        let body = ask(&state, "Quantos assinantes tem a Orange em 2023?").await;

        assert_eq!(
            body["response_text"],
            "Não encontrei dados de assinantes (Orange) para 2023."
        );
        assert!(body["chart_descriptors"].as_array().map_or(true, |c| c.is_empty()));
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_text() {
        let (status, body) = send(
            &test_state(),
            post_json("/api/chat", serde_json::json!({ "text": "  " })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn test_history_after_chat() {
        let state = test_state();
        let reply = ask(&state, "ola").await;
        let session_id = reply["session_id"].as_str().unwrap();

        let (status, body) = send(&state, get(&format!("/api/sessions/{}/history", session_id))).await;

        assert_eq!(status, StatusCode::OK);
        let turns = body["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[1]["role"], "assistant");

        let (_, limited) = send(
            &state,
            get(&format!("/api/sessions/{}/history?limit=1", session_id)),
        )
        .await;
        assert_eq!(limited["turns"].as_array().unwrap().len(), 1);
        assert_eq!(limited["turns"][0]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_history_unknown_session() {
        let (status, body) = send(&test_state(), get("/api/sessions/missing/history")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_reset_returns_welcome() {
        let state = test_state();
        let reply = ask(&state, "ola").await;
        let session_id = reply["session_id"].as_str().unwrap();

        let (status, body) = send(
            &state,
            post_json("/api/sessions/reset", serde_json::json!({ "session_id": session_id })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["acknowledged"], true);
        assert_eq!(body["session_id"], session_id);
        assert!(body["welcome"]["suggestions"].as_array().is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn test_reset_without_body() {
        let state = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/api/sessions/reset")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["acknowledged"], true);
        assert!(body["session_id"].as_str().is_some_and(|s| !s.is_empty()));
        assert_eq!(state.assistant.sessions().count(), 1);
    }

    #[tokio::test]
    async fn test_reset_ignores_foreign_owner() {
        let state = test_state();
        let (_, reply) = send(
            &state,
            post_json(
                "/api/chat",
                serde_json::json!({ "text": "ola", "owner": "ana@arn.gw" }),
            ),
        )
        .await;
        let session_id = reply["session_id"].as_str().unwrap();

        let (status, body) = send(
            &state,
            post_json(
                "/api/sessions/reset",
                serde_json::json!({ "session_id": session_id, "owner": "rui@arn.gw" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_ne!(body["session_id"], session_id);

        let (_, history) = send(&state, get(&format!("/api/sessions/{}/history", session_id))).await;
        assert_eq!(history["turns"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_end_session() {
        let state = test_state();
        let reply = ask(&state, "ola").await;
        let uri = format!("/api/sessions/{}", reply["session_id"].as_str().unwrap());
        let delete = |uri: &str| {
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        };

        let (status, _) = send(&state, delete(&uri)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&state, delete(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_intent_catalog() {
        let (status, body) = send(&test_state(), get("/api/intents")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 10);
        assert_eq!(body["intents"][0]["name"], "subscriber_query");
    }

    #[tokio::test]
    async fn test_cache_stats_after_query() {
        let state = test_state();
        ask(&state, "Quantos assinantes tem a Orange em 2023?").await;
        ask(&state, "Quantos assinantes tem a Orange em 2023?").await;

        let (status, body) = send(&state, get("/api/cache/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"], 1);
        assert_eq!(body["stores"], 1);
        assert_eq!(body["hits"], 1);
    }

    #[tokio::test]
    async fn test_metrics_disabled_without_recorder() {
        let response = create_router(test_state()).oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
