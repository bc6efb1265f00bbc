use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio::task::JoinError;
use tracing::{error, warn};

use crate::error::RetrievalError;

/// Error returned by every handler, rendered as
/// `{"error": {"code", "message", "suggestions"}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    suggestions: Vec<&'static str>,
}

impl From<RetrievalError> for ApiError {
    fn from(err: RetrievalError) -> Self {
        let status = if err.is_client_error() {
            warn!(code = err.status_code(), "Request rejected: {err}");
            StatusCode::BAD_REQUEST
        } else {
            error!(code = err.status_code(), "Request failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        Self {
            status,
            body: ErrorBody {
                code: err.status_code(),
                message: err.to_string(),
                suggestions: err.recovery_suggestions(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("Request body over the size limit: {}", rejection.body_text());
            return Self {
                status,
                body: ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: rejection.body_text(),
                    suggestions: vec![
                        "Split the documents across several requests",
                        "Raise server.max_body_bytes in settings.toml",
                    ],
                },
            };
        }

        warn!("Malformed request body: {}", rejection.body_text());
        Self {
            status,
            body: ErrorBody {
                code: "MALFORMED_REQUEST",
                message: rejection.body_text(),
                suggestions: vec!["Send a JSON body matching the endpoint's documented shape"],
            },
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        error!("Store task did not complete: {err}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                code: "INTERNAL_ERROR",
                message: format!("Store task did not complete: {err}"),
                suggestions: vec!["Check the server logs for a panic in the store"],
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorEnvelope { error: &self.body })).into_response()
    }
}
