use axum::extract::rejection::{ JsonRejection, QueryRejection };
use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use log::{ error, warn };
use serde_json::json;
use thiserror::Error;

use crate::llm::chat::UpstreamError;

pub const UPSTREAM_ERROR_MESSAGE: &str = "Server error talking to the completion provider";
pub const INTERNAL_ERROR_MESSAGE: &str = "Server error";

/// Every failure a request handler can report. Each variant maps to exactly
/// one HTTP status and a JSON body, so nothing escapes to the transport layer.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The caller's payload failed a shape or presence check.
    #[error("{0}")]
    InvalidRequest(String),
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),
    /// Anything else, e.g. a poisoned store lock or a handler panic.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GatewayError::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) | GatewayError::Internal(_) =>
                StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        GatewayError::InvalidRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            GatewayError::InvalidRequest(message) => {
                warn!("Rejected request: {}", message);
                json!({ "error": message })
            }
            GatewayError::Upstream(upstream) => {
                error!("Upstream completion failed: {}", upstream);
                json!({ "error": UPSTREAM_ERROR_MESSAGE, "details": upstream.diagnostic() })
            }
            GatewayError::Internal(message) => {
                error!("Internal fault: {}", message);
                json!({ "error": INTERNAL_ERROR_MESSAGE })
            }
        };
        (status, Json(body)).into_response()
    }
}
