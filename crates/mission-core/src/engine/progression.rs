//! Progresión de workflows simples.
//!
//! Reglas:
//! - `advance` sólo incrementa `current_step` si el step en la posición actual
//!   está `completed`. Si no hay fila de step en esa posición no hay
//!   compuerta: se avanza directamente (fallback permisivo explícito).
//! - Nunca se pasa de `total_steps`; en la última posición `advance` devuelve
//!   `WorkflowComplete` sin escribir.
//! - Al avanzar, el step de la nueva posición (si existe) pasa a `active`.

use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::model::{NewWorkflow, Step, Workflow, WorkflowDetail, WorkflowStatus};
use crate::repo::{MissionStore, WorkflowCommit};
use crate::step::{apply_transition, StepGate, StepStatus, StepTransition};

use super::MissionEngine;

fn step_at(steps: &[Step], step_number: i32) -> Option<&Step> {
    steps.iter().find(|s| s.step_number == step_number)
}

fn check_bounds(workflow: &Workflow) -> Result<(), EngineError> {
    if workflow.current_step < 1 || workflow.current_step > workflow.total_steps {
        return Err(EngineError::Validation(format!("workflow {} has current step {} outside 1..={}",
                                                   workflow.id, workflow.current_step, workflow.total_steps)));
    }
    Ok(())
}

fn gate_for(step: &Step, steps: &[Step]) -> StepGate {
    StepGate { predecessor: step_at(steps, step.step_number - 1).map(|p| p.status),
               requires_approval: step.requires_approval,
               proof_required: step.proof_required }
}

/// Un workflow está completo cuando está en su última posición y esa
/// posición no tiene step pendiente.
pub fn derive_status(workflow: &Workflow, steps: &[Step]) -> WorkflowStatus {
    if workflow.current_step < workflow.total_steps {
        return WorkflowStatus::InProgress;
    }
    match step_at(steps, workflow.total_steps) {
        Some(step) if step.status != StepStatus::Completed => WorkflowStatus::InProgress,
        _ => WorkflowStatus::Completed,
    }
}

/// Planifica `advance` sin tocar el store.
pub fn plan_advance(workflow: &Workflow, steps: &[Step], now: DateTime<Utc>) -> Result<WorkflowCommit, EngineError> {
    check_bounds(workflow)?;
    let current = step_at(steps, workflow.current_step);
    if let Some(step) = current {
        if step.status != StepStatus::Completed {
            return Err(EngineError::StepNotCompleted { step_number: workflow.current_step });
        }
    }
    if workflow.current_step >= workflow.total_steps {
        return Err(EngineError::WorkflowComplete { total_steps: workflow.total_steps });
    }

    let mut next = workflow.clone();
    next.current_step += 1;

    let mut changed = Vec::new();
    if let Some(step) = step_at(steps, next.current_step) {
        if step.status == StepStatus::Locked {
            let state = apply_transition(&step.state(), &gate_for(step, steps), &StepTransition::activate(), now)?;
            changed.push(step.clone().with_state(state));
        }
    }

    let projected: Vec<Step> = steps.iter()
                                    .map(|s| changed.iter().find(|c| c.id == s.id).unwrap_or(s).clone())
                                    .collect();
    next.status = derive_status(&next, &projected);

    Ok(WorkflowCommit { expected_version: workflow.version,
                        workflow: next,
                        steps: changed })
}

/// Planifica una transición sobre un step del workflow. Sólo el step de la
/// posición actual puede moverse; cualquier otro sería saltar adelante (o
/// reabrir uno ya hecho).
pub fn plan_step_submission(workflow: &Workflow,
                            steps: &[Step],
                            step_id: Uuid,
                            transition: &StepTransition,
                            now: DateTime<Utc>)
                            -> Result<WorkflowCommit, EngineError> {
    check_bounds(workflow)?;
    let step = steps.iter()
                    .find(|s| s.id == step_id)
                    .ok_or_else(|| EngineError::not_found("step", step_id))?;
    if step.step_number != workflow.current_step {
        return Err(EngineError::invalid(step.status,
                                        transition.status,
                                        format!("step {} is not the current step ({})",
                                                step.step_number, workflow.current_step)));
    }

    let state = apply_transition(&step.state(), &gate_for(step, steps), transition, now)?;
    let updated = step.clone().with_state(state);

    let projected: Vec<Step> = steps.iter()
                                    .map(|s| if s.id == updated.id { updated.clone() } else { s.clone() })
                                    .collect();
    let mut next = workflow.clone();
    next.status = derive_status(&next, &projected);

    Ok(WorkflowCommit { expected_version: workflow.version,
                        workflow: next,
                        steps: vec![updated] })
}

impl<S> MissionEngine<S> where S: MissionStore
{
    pub fn create_workflow(&self, new: NewWorkflow) -> Result<WorkflowDetail, EngineError> {
        let total_steps = new.validate()?;
        let id = Uuid::new_v4();
        let steps: Vec<Step> = new.steps
                                  .iter()
                                  .zip(1..)
                                  .map(|(draft, number)| {
                                      let status = if number == 1 { StepStatus::Active } else { StepStatus::Locked };
                                      Step::for_workflow(id, draft, number, status)
                                  })
                                  .collect();
        let mut workflow = Workflow { id,
                                      name: new.name.trim().to_string(),
                                      description: new.description,
                                      total_steps,
                                      current_step: 1,
                                      is_active: false,
                                      status: WorkflowStatus::InProgress,
                                      priority: new.priority.unwrap_or_default(),
                                      version: 0,
                                      created_at: self.now() };
        workflow.status = derive_status(&workflow, &steps);
        self.store.insert_workflow(&workflow, &steps)?;
        info!("workflow created id={id} total_steps={total_steps} steps={}", steps.len());
        Ok(WorkflowDetail { workflow, steps })
    }

    pub fn list_workflows(&self) -> Result<Vec<Workflow>, EngineError> {
        let active = self.store.active_workflow_id()?;
        Ok(self.store
               .list_workflows()?
               .into_iter()
               .map(|wf| Self::project_active(wf, active))
               .collect())
    }

    pub fn get_workflow(&self, id: Uuid) -> Result<WorkflowDetail, EngineError> {
        let workflow = self.store
                           .get_workflow(id)?
                           .ok_or_else(|| EngineError::not_found("workflow", id))?;
        let steps = self.store.workflow_steps(id)?;
        let active = self.store.active_workflow_id()?;
        Ok(WorkflowDetail { workflow: Self::project_active(workflow, active),
                            steps })
    }

    pub fn delete_workflow(&self, id: Uuid) -> Result<(), EngineError> {
        if !self.store.delete_workflow(id)? {
            return Err(EngineError::not_found("workflow", id));
        }
        info!("workflow deleted id={id}");
        Ok(())
    }

    /// Avanza `current_step` una posición. Ver reglas del módulo.
    pub fn advance(&self, id: Uuid) -> Result<WorkflowDetail, EngineError> {
        let detail = self.get_workflow(id)?;
        let commit = plan_advance(&detail.workflow, &detail.steps, self.now())?;
        debug!("advance:plan workflow={id} {} -> {} (version {})",
               detail.workflow.current_step, commit.workflow.current_step, commit.expected_version);
        self.store.commit_workflow(&commit)?;
        info!("workflow advanced id={id} current_step={}", commit.workflow.current_step);
        self.get_workflow(id)
    }

    /// Aplica una transición (activar, adjuntar prueba, completar) al step
    /// `step_id` del workflow.
    pub fn submit_step(&self, workflow_id: Uuid, step_id: Uuid, transition: StepTransition) -> Result<WorkflowDetail, EngineError> {
        let detail = self.get_workflow(workflow_id)?;
        let commit = plan_step_submission(&detail.workflow, &detail.steps, step_id, &transition, self.now())?;
        self.store.commit_workflow(&commit)?;
        debug!("submit_step workflow={workflow_id} step={step_id} -> {}", transition.status);
        self.get_workflow(workflow_id)
    }
}
