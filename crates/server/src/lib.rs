//! ARN Assistant Server
//!
//! HTTP surface for the conversational analytics assistant, plus the
//! in-memory regulatory dataset it answers from.

pub mod dataset;
pub mod http;
pub mod metrics;
pub mod state;

pub use self::dataset::{DatasetError, IndicatorRecord, InMemoryDataSource};
pub use self::http::create_router;
pub use self::metrics::{describe_metrics, init_metrics};
pub use self::state::AppState;

use arn_assistant_agent::AssistantError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::NotFound(_) => "not_found",
            ServerError::Unavailable(_) => "unavailable",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl From<AssistantError> for ServerError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::Input(message) => ServerError::InvalidRequest(message),
            AssistantError::Session(message) => ServerError::NotFound(message),
            other => {
                tracing::error!(error = %other, "Request failed");
                ServerError::Internal("Ocorreu um erro interno.".to_string())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServerError::InvalidRequest(m)
            | ServerError::NotFound(m)
            | ServerError::Unavailable(m)
            | ServerError::Internal(m) => m.clone(),
        };

        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": message,
        }));
        (self.status(), body).into_response()
    }
}
