//! Errores del motor de misiones.
//!
//! Cada operación del engine devuelve una de estas variantes en lugar de
//! errores crudos del almacenamiento. La capa HTTP las traduce a códigos
//! estables con `EngineError::code`.

use thiserror::Error;
use uuid::Uuid;

use crate::repo::StoreError;
use crate::step::StepStatus;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid transition {from} -> {to}: {reason}")]
    InvalidTransition { from: StepStatus, to: StepStatus, reason: String },
    #[error("step {step_number} must be completed before advancing")]
    StepNotCompleted { step_number: i32 },
    #[error("workflow already at its final step ({total_steps})")]
    WorkflowComplete { total_steps: i32 },
    #[error("step {step_id} is not part of composite {composite_id}")]
    StepNotInComposite { step_id: Uuid, composite_id: Uuid },
    #[error("concurrent modification: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound { entity, id: id.to_string() }
    }

    pub fn invalid(from: StepStatus, to: StepStatus, reason: impl Into<String>) -> Self {
        EngineError::InvalidTransition { from, to, reason: reason.into() }
    }

    /// Código máquina estable (se expone tal cual en las respuestas HTTP).
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "NOT_FOUND",
            EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EngineError::StepNotCompleted { .. } => "STEP_NOT_COMPLETED",
            EngineError::WorkflowComplete { .. } => "WORKFLOW_COMPLETE",
            EngineError::StepNotInComposite { .. } => "STEP_NOT_IN_COMPOSITE",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Sólo conflictos de concurrencia y fallos del backend pueden
    /// reintentarse desde el caller. El engine nunca reintenta por sí mismo.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Conflict(_) | EngineError::Storage(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => EngineError::NotFound { entity: "record", id: what },
            StoreError::Conflict(msg) => EngineError::Conflict(msg),
            StoreError::Backend(msg) => EngineError::Storage(msg),
        }
    }
}
