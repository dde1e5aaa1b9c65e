//! Traducción de errores del engine a respuestas HTTP.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mission_core::{EngineError, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Engine(err.into())
    }
}

// Entrada mal formada: se reporta como validación para conservar `{error, code}`.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Engine(EngineError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Engine(EngineError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Engine(EngineError::Validation(rejection.body_text()))
    }
}

/// Cuerpo de error: `{ "error": "...", "code": "..." }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Engine(err) => {
                let status = match err {
                    EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
                    EngineError::InvalidTransition { .. }
                    | EngineError::StepNotCompleted { .. }
                    | EngineError::WorkflowComplete { .. }
                    | EngineError::Conflict(_) => StatusCode::CONFLICT,
                    EngineError::StepNotInComposite { .. } | EngineError::Validation(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    EngineError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, err.code())
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, "request failed: {self}");
        } else {
            tracing::debug!(code, "request rejected: {self}");
        }
        let body = ErrorResponse { error: self.to_string(),
                                   code: code.to_string() };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
