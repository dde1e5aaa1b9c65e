//! Filas Diesel y su mapeo dominio <-> DB. Los estados se guardan como texto
//! (`as_str`) y las pruebas como JSONB.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use mission_core::model::{CompositeWorkflow, CompositeWorkflowItem, CompositeWorkflowSession, Note, Proof, SessionStep,
                          Step, Workflow};
use mission_core::StepStatus;
use serde_json::Value;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::schema::{composite_workflow_items, composite_workflow_session_steps, composite_workflow_sessions,
                    composite_workflows, notes, workflow_steps, workflows};

fn parse<T>(raw: &str) -> Result<T, PersistenceError>
    where T: FromStr<Err = String>
{
    raw.parse().map_err(PersistenceError::Corrupt)
}

pub(crate) fn proof_to_json(proof: &Proof) -> Result<Value, PersistenceError> {
    serde_json::to_value(proof).map_err(|e| PersistenceError::Unknown(format!("proof encode: {e}")))
}

fn proof_from_json(value: Value) -> Result<Proof, PersistenceError> {
    serde_json::from_value(value).map_err(|e| PersistenceError::Corrupt(format!("proof decode: {e}")))
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = workflows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub total_steps: i32,
    pub current_step: i32,
    pub status: String,
    pub priority: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRow {
    pub fn from_model(wf: &Workflow) -> Self {
        Self { id: wf.id,
               name: wf.name.clone(),
               description: wf.description.clone(),
               total_steps: wf.total_steps,
               current_step: wf.current_step,
               status: wf.status.as_str().to_string(),
               priority: wf.priority.as_str().to_string(),
               version: wf.version,
               created_at: wf.created_at }
    }

    /// `is_active` se proyecta en el engine; aquí siempre `false`.
    pub fn into_model(self) -> Result<Workflow, PersistenceError> {
        Ok(Workflow { id: self.id,
                      name: self.name,
                      description: self.description,
                      total_steps: self.total_steps,
                      current_step: self.current_step,
                      is_active: false,
                      status: parse(&self.status)?,
                      priority: parse(&self.priority)?,
                      version: self.version,
                      created_at: self.created_at })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = workflow_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StepRow {
    pub id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub composite_id: Option<Uuid>,
    pub step_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub is_completed: bool,
    pub requires_approval: bool,
    pub proof_required: bool,
    pub proof: Value,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepRow {
    pub fn from_model(step: &Step) -> Result<Self, PersistenceError> {
        Ok(Self { id: step.id,
                  workflow_id: step.workflow_id,
                  composite_id: step.composite_id,
                  step_number: step.step_number,
                  name: step.name.clone(),
                  description: step.description.clone(),
                  status: step.status.as_str().to_string(),
                  is_completed: step.is_completed,
                  requires_approval: step.requires_approval,
                  proof_required: step.proof_required,
                  proof: proof_to_json(&step.proof)?,
                  completed_at: step.completed_at })
    }

    pub fn into_model(self) -> Result<Step, PersistenceError> {
        let status: StepStatus = parse(&self.status)?;
        Ok(Step { id: self.id,
                  workflow_id: self.workflow_id,
                  composite_id: self.composite_id,
                  step_number: self.step_number,
                  name: self.name,
                  description: self.description,
                  status,
                  is_completed: self.is_completed,
                  requires_approval: self.requires_approval,
                  proof_required: self.proof_required,
                  proof: proof_from_json(self.proof)?,
                  completed_at: self.completed_at })
    }
}

/// Estado mutable de un step de workflow (lo único que reescribe un commit).
#[derive(AsChangeset, Debug)]
#[diesel(table_name = workflow_steps)]
#[diesel(treat_none_as_null = true)]
pub struct StepStateChanges {
    pub status: String,
    pub is_completed: bool,
    pub proof: Value,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepStateChanges {
    pub fn from_model(step: &Step) -> Result<Self, PersistenceError> {
        Ok(Self { status: step.status.as_str().to_string(),
                  is_completed: step.is_completed,
                  proof: proof_to_json(&step.proof)?,
                  completed_at: step.completed_at })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = composite_workflows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CompositeRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CompositeWorkflow> for CompositeRow {
    fn from(c: &CompositeWorkflow) -> Self {
        Self { id: c.id,
               name: c.name.clone(),
               created_at: c.created_at }
    }
}

impl From<CompositeRow> for CompositeWorkflow {
    fn from(row: CompositeRow) -> Self {
        Self { id: row.id,
               name: row.name,
               created_at: row.created_at }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = composite_workflow_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ItemRow {
    pub id: Uuid,
    pub composite_id: Uuid,
    pub step_id: Uuid,
    pub order_index: i32,
}

impl From<&CompositeWorkflowItem> for ItemRow {
    fn from(item: &CompositeWorkflowItem) -> Self {
        Self { id: item.id,
               composite_id: item.composite_id,
               step_id: item.step_id,
               order_index: item.order_index }
    }
}

impl From<ItemRow> for CompositeWorkflowItem {
    fn from(row: ItemRow) -> Self {
        Self { id: row.id,
               composite_id: row.composite_id,
               step_id: row.step_id,
               order_index: row.order_index }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = composite_workflow_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionRow {
    pub id: Uuid,
    pub composite_id: Uuid,
    pub name: Option<String>,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&CompositeWorkflowSession> for SessionRow {
    fn from(s: &CompositeWorkflowSession) -> Self {
        Self { id: s.id,
               composite_id: s.composite_id,
               name: s.name.clone(),
               owner_id: s.owner_id.clone(),
               created_at: s.created_at }
    }
}

impl From<SessionRow> for CompositeWorkflowSession {
    fn from(row: SessionRow) -> Self {
        Self { id: row.id,
               composite_id: row.composite_id,
               name: row.name,
               owner_id: row.owner_id,
               created_at: row.created_at }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = composite_workflow_session_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionStepRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub step_id: Uuid,
    pub status: String,
    pub proof: Value,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl SessionStepRow {
    pub fn from_model(row: &SessionStep) -> Result<Self, PersistenceError> {
        Ok(Self { id: row.id,
                  session_id: row.session_id,
                  step_id: row.step_id,
                  status: row.status.as_str().to_string(),
                  proof: proof_to_json(&row.proof)?,
                  completed_at: row.completed_at,
                  version: row.version })
    }

    pub fn into_model(self) -> Result<SessionStep, PersistenceError> {
        Ok(SessionStep { id: self.id,
                         session_id: self.session_id,
                         step_id: self.step_id,
                         status: parse(&self.status)?,
                         proof: proof_from_json(self.proof)?,
                         completed_at: self.completed_at,
                         version: self.version })
    }
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = composite_workflow_session_steps)]
#[diesel(treat_none_as_null = true)]
pub struct SessionStepChanges<'a> {
    pub status: &'a str,
    pub proof: &'a Value,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl<'a> From<&'a SessionStepRow> for SessionStepChanges<'a> {
    fn from(row: &'a SessionStepRow) -> Self {
        Self { status: &row.status,
               proof: &row.proof,
               completed_at: row.completed_at,
               version: row.version }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = notes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NoteRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Note> for NoteRow {
    fn from(n: &Note) -> Self {
        Self { id: n.id,
               title: n.title.clone(),
               content: n.content.clone(),
               created_at: n.created_at,
               updated_at: n.updated_at }
    }
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self { id: row.id,
               title: row.title,
               content: row.content,
               created_at: row.created_at,
               updated_at: row.updated_at }
    }
}
