//! Workflows ("misiones") y sus steps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::model::proof::Proof;
use crate::step::{StepState, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    Completed,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
        }
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(WorkflowStatus::InProgress),
            "completed" => Ok(WorkflowStatus::Completed),
            other => Err(format!("unknown workflow status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow persistido.
///
/// Invariante: `1 <= current_step <= total_steps`. `is_active` no se guarda
/// en la fila: se proyecta desde el puntero de workflow activo cada vez que
/// el engine devuelve un workflow. `version` es el token de concurrencia
/// optimista.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub total_steps: i32,
    pub current_step: i32,
    pub is_active: bool,
    pub status: WorkflowStatus,
    pub priority: Priority,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Step de un workflow o plantilla de un composite (exactamente uno de
/// `workflow_id` / `composite_id` está presente).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub composite_id: Option<Uuid>,
    pub step_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: StepStatus,
    pub is_completed: bool,
    pub requires_approval: bool,
    pub proof_required: bool,
    pub proof: Proof,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    fn from_draft(draft: &NewStep, step_number: i32, status: StepStatus) -> Self {
        Self { id: Uuid::new_v4(),
               workflow_id: None,
               composite_id: None,
               step_number,
               name: draft.name.trim().to_string(),
               description: draft.description.clone(),
               status,
               is_completed: false,
               requires_approval: draft.requires_approval,
               proof_required: draft.proof_required,
               proof: Proof::default(),
               completed_at: None }
    }

    pub fn for_workflow(workflow_id: Uuid, draft: &NewStep, step_number: i32, status: StepStatus) -> Self {
        Self { workflow_id: Some(workflow_id),
               ..Self::from_draft(draft, step_number, status) }
    }

    pub fn for_composite(composite_id: Uuid, draft: &NewStep, step_number: i32) -> Self {
        Self { composite_id: Some(composite_id),
               ..Self::from_draft(draft, step_number, StepStatus::Locked) }
    }

    pub fn state(&self) -> StepState {
        StepState { status: self.status,
                    proof: self.proof.clone(),
                    completed_at: self.completed_at }
    }

    pub fn with_state(mut self, state: StepState) -> Self {
        self.is_completed = state.status == StepStatus::Completed;
        self.status = state.status;
        self.proof = state.proof;
        self.completed_at = state.completed_at;
        self
    }
}

/// Workflow junto con sus steps ordenados por `step_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDetail {
    #[serde(flatten)]
    pub workflow: Workflow,
    pub steps: Vec<Step>,
}

impl WorkflowDetail {
    pub fn step_at(&self, step_number: i32) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_number == step_number)
    }

    pub fn active_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.status == StepStatus::Active).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStep {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub proof_required: bool,
}

impl NewStep {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Validation("step name is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkflow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_steps: Option<i32>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub steps: Vec<NewStep>,
}

impl NewWorkflow {
    /// Valida el payload y devuelve el `total_steps` efectivo.
    pub fn validate(&self) -> Result<i32, EngineError> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Validation("name is required".into()));
        }
        for step in &self.steps {
            step.validate()?;
        }
        let declared = i32::try_from(self.steps.len()).map_err(|_| EngineError::Validation("too many steps".into()))?;
        let total = self.total_steps.unwrap_or(declared.max(1));
        if total < 1 {
            return Err(EngineError::Validation(format!("totalSteps must be >= 1 (got {total})")));
        }
        if declared > total {
            return Err(EngineError::Validation(format!("{declared} steps declared but totalSteps is {total}")));
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_steps_defaults_to_declared_steps() {
        let new = NewWorkflow { name: "Launch".into(),
                                steps: vec![NewStep::named("a"), NewStep::named("b")],
                                ..NewWorkflow::default() };
        assert_eq!(new.validate(), Ok(2));
        let bare = NewWorkflow { name: "Bare".into(),
                                 ..NewWorkflow::default() };
        assert_eq!(bare.validate(), Ok(1));
    }

    #[test]
    fn rejects_blank_names_and_bad_totals() {
        let blank = NewWorkflow { name: "  ".into(),
                                  ..NewWorkflow::default() };
        assert!(matches!(blank.validate(), Err(EngineError::Validation(_))));

        let zero = NewWorkflow { name: "x".into(),
                                 total_steps: Some(0),
                                 ..NewWorkflow::default() };
        assert!(matches!(zero.validate(), Err(EngineError::Validation(_))));

        let short = NewWorkflow { name: "x".into(),
                                  total_steps: Some(1),
                                  steps: vec![NewStep::named("a"), NewStep::named("b")],
                                  ..NewWorkflow::default() };
        assert!(matches!(short.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn detail_serializes_flat_with_steps() {
        let wf = Workflow { id: Uuid::nil(),
                            name: "M".into(),
                            description: None,
                            total_steps: 1,
                            current_step: 1,
                            is_active: false,
                            status: WorkflowStatus::InProgress,
                            priority: Priority::High,
                            version: 0,
                            created_at: Utc::now() };
        let v = serde_json::to_value(WorkflowDetail { workflow: wf, steps: vec![] }).unwrap();
        assert_eq!(v["currentStep"], 1);
        assert_eq!(v["status"], "in_progress");
        assert_eq!(v["priority"], "high");
        assert!(v["steps"].as_array().unwrap().is_empty());
    }
}
