//! Backend en memoria.
//!
//! Todas las tablas viven detrás de un único `Mutex`, de modo que cada
//! método del trait es atómico respecto a los demás (equivalente a una
//! transacción serializable). `IndexMap` conserva el orden de inserción para
//! que los listados sean estables, igual que `ORDER BY created_at` en
//! Postgres.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;
use uuid::Uuid;

use super::types::{MissionStore, NoteStore, StoreError, WorkflowCommit};
use crate::model::{CompositeWorkflow, CompositeWorkflowItem, CompositeWorkflowSession, Note, SessionStep, Step, Workflow};

#[derive(Default)]
struct Tables {
    workflows: IndexMap<Uuid, Workflow>,
    steps: IndexMap<Uuid, Step>,
    composites: IndexMap<Uuid, CompositeWorkflow>,
    items: IndexMap<Uuid, CompositeWorkflowItem>,
    sessions: IndexMap<Uuid, CompositeWorkflowSession>,
    session_steps: IndexMap<(Uuid, Uuid), SessionStep>,
    notes: IndexMap<Uuid, Note>,
    active_workflow_id: Option<Uuid>,
}

impl Tables {
    /// Elimina steps y todo lo que cuelga de ellos (FK en cascada).
    fn cascade_steps(&mut self, doomed: &HashSet<Uuid>) {
        if doomed.is_empty() {
            return;
        }
        self.steps.retain(|id, _| !doomed.contains(id));
        self.items.retain(|_, item| !doomed.contains(&item.step_id));
        self.session_steps.retain(|(_, step_id), _| !doomed.contains(step_id));
    }

    fn cascade_sessions(&mut self, doomed: &HashSet<Uuid>) {
        if doomed.is_empty() {
            return;
        }
        self.sessions.retain(|id, _| !doomed.contains(id));
        self.session_steps.retain(|(session_id, _), _| !doomed.contains(session_id));
    }
}

#[derive(Default)]
pub struct InMemoryMissionStore {
    inner: Mutex<Tables>,
}

impl InMemoryMissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".into()))
    }
}

impl MissionStore for InMemoryMissionStore {
    fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        Ok(self.tables()?.workflows.values().cloned().collect())
    }

    fn get_workflow(&self, id: Uuid) -> Result<Option<Workflow>, StoreError> {
        Ok(self.tables()?.workflows.get(&id).cloned())
    }

    fn insert_workflow(&self, workflow: &Workflow, steps: &[Step]) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        if t.workflows.contains_key(&workflow.id) {
            return Err(StoreError::Conflict(format!("workflow {} already exists", workflow.id)));
        }
        let mut numbers = HashSet::new();
        for step in steps {
            if step.workflow_id != Some(workflow.id) || !numbers.insert(step.step_number) {
                return Err(StoreError::Conflict(format!("step {} does not fit workflow {}", step.id, workflow.id)));
            }
        }
        t.workflows.insert(workflow.id, workflow.clone());
        for step in steps {
            t.steps.insert(step.id, step.clone());
        }
        Ok(())
    }

    fn delete_workflow(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables()?;
        if t.workflows.shift_remove(&id).is_none() {
            return Ok(false);
        }
        let doomed: HashSet<Uuid> = t.steps
                                     .values()
                                     .filter(|s| s.workflow_id == Some(id))
                                     .map(|s| s.id)
                                     .collect();
        t.cascade_steps(&doomed);
        if t.active_workflow_id == Some(id) {
            t.active_workflow_id = None;
        }
        Ok(true)
    }

    fn workflow_steps(&self, workflow_id: Uuid) -> Result<Vec<Step>, StoreError> {
        let t = self.tables()?;
        let mut steps: Vec<Step> = t.steps
                                    .values()
                                    .filter(|s| s.workflow_id == Some(workflow_id))
                                    .cloned()
                                    .collect();
        steps.sort_by_key(|s| s.step_number);
        Ok(steps)
    }

    fn commit_workflow(&self, commit: &WorkflowCommit) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        let id = commit.workflow.id;
        let stored = t.workflows
                      .get(&id)
                      .ok_or_else(|| StoreError::NotFound(format!("workflow {id}")))?;
        if stored.version != commit.expected_version {
            return Err(StoreError::Conflict(format!("workflow {id} is at version {} (expected {})",
                                                    stored.version, commit.expected_version)));
        }
        for step in &commit.steps {
            match t.steps.get(&step.id) {
                Some(existing) if existing.workflow_id == Some(id) => {}
                _ => return Err(StoreError::NotFound(format!("step {} of workflow {id}", step.id))),
            }
        }
        if let Some(row) = t.workflows.get_mut(&id) {
            row.current_step = commit.workflow.current_step;
            row.status = commit.workflow.status;
            row.version = commit.expected_version + 1;
        }
        for step in &commit.steps {
            if let Some(row) = t.steps.get_mut(&step.id) {
                row.status = step.status;
                row.is_completed = step.is_completed;
                row.proof = step.proof.clone();
                row.completed_at = step.completed_at;
            }
        }
        Ok(())
    }

    fn get_steps(&self, ids: &[Uuid]) -> Result<Vec<Step>, StoreError> {
        let t = self.tables()?;
        Ok(ids.iter().filter_map(|id| t.steps.get(id).cloned()).collect())
    }

    fn active_workflow_id(&self) -> Result<Option<Uuid>, StoreError> {
        Ok(self.tables()?.active_workflow_id)
    }

    fn set_active_workflow(&self, id: Uuid) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        if !t.workflows.contains_key(&id) {
            return Err(StoreError::NotFound(format!("workflow {id}")));
        }
        t.active_workflow_id = Some(id);
        Ok(())
    }

    fn list_composites(&self) -> Result<Vec<CompositeWorkflow>, StoreError> {
        Ok(self.tables()?.composites.values().cloned().collect())
    }

    fn get_composite(&self, id: Uuid) -> Result<Option<CompositeWorkflow>, StoreError> {
        Ok(self.tables()?.composites.get(&id).cloned())
    }

    fn insert_composite(&self,
                        composite: &CompositeWorkflow,
                        template_steps: &[Step],
                        items: &[CompositeWorkflowItem])
                        -> Result<(), StoreError> {
        let mut t = self.tables()?;
        if t.composites.contains_key(&composite.id) {
            return Err(StoreError::Conflict(format!("composite {} already exists", composite.id)));
        }
        let new_steps: HashSet<Uuid> = template_steps.iter().map(|s| s.id).collect();
        let mut order = HashSet::new();
        for item in items {
            if !t.steps.contains_key(&item.step_id) && !new_steps.contains(&item.step_id) {
                return Err(StoreError::NotFound(format!("step {}", item.step_id)));
            }
            if !order.insert(item.order_index) {
                return Err(StoreError::Conflict(format!("duplicate order index {} in composite {}",
                                                        item.order_index, composite.id)));
            }
        }
        t.composites.insert(composite.id, composite.clone());
        for step in template_steps {
            t.steps.insert(step.id, step.clone());
        }
        for item in items {
            t.items.insert(item.id, item.clone());
        }
        Ok(())
    }

    fn delete_composite(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables()?;
        if t.composites.shift_remove(&id).is_none() {
            return Ok(false);
        }
        t.items.retain(|_, item| item.composite_id != id);
        let sessions: HashSet<Uuid> = t.sessions
                                       .values()
                                       .filter(|s| s.composite_id == id)
                                       .map(|s| s.id)
                                       .collect();
        t.cascade_sessions(&sessions);
        let templates: HashSet<Uuid> = t.steps
                                        .values()
                                        .filter(|s| s.composite_id == Some(id))
                                        .map(|s| s.id)
                                        .collect();
        t.cascade_steps(&templates);
        Ok(true)
    }

    fn composite_items(&self, composite_id: Uuid) -> Result<Vec<CompositeWorkflowItem>, StoreError> {
        let t = self.tables()?;
        Ok(t.items
            .values()
            .filter(|i| i.composite_id == composite_id)
            .cloned()
            .collect())
    }

    fn insert_session(&self, session: &CompositeWorkflowSession) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        if !t.composites.contains_key(&session.composite_id) {
            return Err(StoreError::NotFound(format!("composite {}", session.composite_id)));
        }
        t.sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn get_session(&self, id: Uuid) -> Result<Option<CompositeWorkflowSession>, StoreError> {
        Ok(self.tables()?.sessions.get(&id).cloned())
    }

    fn list_sessions(&self, composite_id: Option<Uuid>) -> Result<Vec<CompositeWorkflowSession>, StoreError> {
        let t = self.tables()?;
        Ok(t.sessions
            .values()
            .filter(|s| composite_id.map_or(true, |c| s.composite_id == c))
            .cloned()
            .collect())
    }

    fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables()?;
        if !t.sessions.contains_key(&id) {
            return Ok(false);
        }
        t.cascade_sessions(&HashSet::from([id]));
        Ok(true)
    }

    fn session_steps(&self, session_id: Uuid) -> Result<Vec<SessionStep>, StoreError> {
        let t = self.tables()?;
        Ok(t.session_steps
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    fn upsert_session_step(&self, row: &SessionStep, expected_version: Option<i64>) -> Result<(), StoreError> {
        let mut t = self.tables()?;
        if !t.sessions.contains_key(&row.session_id) {
            return Err(StoreError::NotFound(format!("session {}", row.session_id)));
        }
        if !t.steps.contains_key(&row.step_id) {
            return Err(StoreError::NotFound(format!("step {}", row.step_id)));
        }
        let key = (row.session_id, row.step_id);
        match (t.session_steps.get(&key), expected_version) {
            (None, None) => {}
            (Some(existing), Some(v)) if existing.version == v => {}
            (Some(existing), _) => {
                return Err(StoreError::Conflict(format!("session step ({}, {}) is at version {}",
                                                        row.session_id, row.step_id, existing.version)));
            }
            (None, Some(_)) => {
                return Err(StoreError::Conflict(format!("session step ({}, {}) vanished", row.session_id, row.step_id)));
            }
        }
        t.session_steps.insert(key, row.clone());
        Ok(())
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.tables().map(|_| ())
    }
}

impl NoteStore for InMemoryMissionStore {
    fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        Ok(self.tables()?.notes.values().cloned().collect())
    }

    fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        Ok(self.tables()?.notes.get(&id).cloned())
    }

    fn insert_note(&self, note: &Note) -> Result<(), StoreError> {
        self.tables()?.notes.insert(note.id, note.clone());
        Ok(())
    }

    fn update_note(&self, note: &Note) -> Result<bool, StoreError> {
        let mut t = self.tables()?;
        match t.notes.get_mut(&note.id) {
            Some(row) => {
                *row = note.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_note(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables()?.notes.shift_remove(&id).is_some())
    }
}
