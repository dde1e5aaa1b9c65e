//! Workflows compuestos, sus items y las sesiones colaborativas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::proof::Proof;
use crate::model::workflow::{NewStep, Step};
use crate::step::{StepState, StepStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeWorkflow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Posición de un step (de cualquier workflow o plantilla propia) dentro del
/// composite. `order_index` es único por composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeWorkflowItem {
    pub id: Uuid,
    pub composite_id: Uuid,
    pub step_id: Uuid,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeWorkflowSession {
    pub id: Uuid,
    pub composite_id: Uuid,
    pub name: Option<String>,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Override por sesión del estado de un step plantilla. Una fila por
/// `(session_id, step_id)`; se crea en la primera interacción.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStep {
    pub id: Uuid,
    pub session_id: Uuid,
    pub step_id: Uuid,
    pub status: StepStatus,
    pub proof: Proof,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl SessionStep {
    pub fn state(&self) -> StepState {
        StepState { status: self.status,
                    proof: self.proof.clone(),
                    completed_at: self.completed_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeDetail {
    #[serde(flatten)]
    pub composite: CompositeWorkflow,
    /// Items en orden canónico (`order_index`, luego `id`).
    pub items: Vec<CompositeWorkflowItem>,
    /// Steps plantilla en el mismo orden que `items`.
    pub steps: Vec<Step>,
}

/// Step tal como lo ve una sesión concreta: campos de la plantilla más el
/// estado efectivo resuelto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStepView {
    pub item_id: Uuid,
    pub order_index: i32,
    pub step_id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub composite_id: Option<Uuid>,
    pub step_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub requires_approval: bool,
    pub proof_required: bool,
    pub status: StepStatus,
    pub is_completed: bool,
    pub proof: Proof,
    pub completed_at: Option<DateTime<Utc>>,
    /// `true` si el estado proviene de una fila de sesión y no del default.
    pub overridden: bool,
}

impl SessionStepView {
    pub fn state(&self) -> StepState {
        StepState { status: self.status,
                    proof: self.proof.clone(),
                    completed_at: self.completed_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session: CompositeWorkflowSession,
    pub composite: CompositeWorkflow,
    pub steps: Vec<SessionStepView>,
    pub completed_steps: usize,
    pub total_steps: usize,
}

impl SessionView {
    pub fn statuses(&self) -> Vec<StepStatus> {
        self.steps.iter().map(|s| s.status).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompositeItem {
    pub order_index: i32,
    /// Referencia a un step existente (de cualquier workflow).
    #[serde(default)]
    pub step_id: Option<Uuid>,
    /// O bien un step plantilla nuevo, propiedad del composite.
    #[serde(default)]
    pub step: Option<NewStep>,
}

impl NewCompositeItem {
    pub fn existing(step_id: Uuid, order_index: i32) -> Self {
        Self { order_index,
               step_id: Some(step_id),
               step: None }
    }

    pub fn template(step: NewStep, order_index: i32) -> Self {
        Self { order_index,
               step_id: None,
               step: Some(step) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComposite {
    pub name: String,
    #[serde(default)]
    pub items: Vec<NewCompositeItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}
