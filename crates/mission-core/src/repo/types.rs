//! Contratos de almacenamiento.
//!
//! El engine sólo conoce estos traits; las implementaciones (memoria,
//! Postgres) garantizan la atomicidad de cada método. Las escrituras que
//! compiten sobre la misma fila usan concurrencia optimista: `version`
//! esperada distinta => `StoreError::Conflict`.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::model::{CompositeWorkflow, CompositeWorkflowItem, CompositeWorkflowSession, Note, SessionStep, Step, Workflow};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend: {0}")]
    Backend(String),
}

/// Escritura atómica del progreso de un workflow.
///
/// Se aplica sólo si la fila sigue en `expected_version`; entonces guarda
/// `current_step`/`status` de `workflow`, incrementa la versión y reescribe
/// el estado de cada step de `steps`.
#[derive(Debug, Clone)]
pub struct WorkflowCommit {
    pub workflow: Workflow,
    pub expected_version: i64,
    pub steps: Vec<Step>,
}

pub trait MissionStore: Send + Sync {
    fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError>;
    fn get_workflow(&self, id: Uuid) -> Result<Option<Workflow>, StoreError>;
    fn insert_workflow(&self, workflow: &Workflow, steps: &[Step]) -> Result<(), StoreError>;
    /// Borra en cascada (steps, items que los referencian, overrides de
    /// sesión) y limpia el puntero activo si apuntaba aquí.
    fn delete_workflow(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Steps del workflow ordenados por `step_number`.
    fn workflow_steps(&self, workflow_id: Uuid) -> Result<Vec<Step>, StoreError>;
    fn commit_workflow(&self, commit: &WorkflowCommit) -> Result<(), StoreError>;
    fn get_steps(&self, ids: &[Uuid]) -> Result<Vec<Step>, StoreError>;

    fn active_workflow_id(&self) -> Result<Option<Uuid>, StoreError>;
    /// Reemplaza el puntero en una sola escritura. `NotFound` si el workflow
    /// no existe.
    fn set_active_workflow(&self, id: Uuid) -> Result<(), StoreError>;

    fn list_composites(&self) -> Result<Vec<CompositeWorkflow>, StoreError>;
    fn get_composite(&self, id: Uuid) -> Result<Option<CompositeWorkflow>, StoreError>;
    fn insert_composite(&self,
                        composite: &CompositeWorkflow,
                        template_steps: &[Step],
                        items: &[CompositeWorkflowItem])
                        -> Result<(), StoreError>;
    fn delete_composite(&self, id: Uuid) -> Result<bool, StoreError>;
    fn composite_items(&self, composite_id: Uuid) -> Result<Vec<CompositeWorkflowItem>, StoreError>;

    fn insert_session(&self, session: &CompositeWorkflowSession) -> Result<(), StoreError>;
    fn get_session(&self, id: Uuid) -> Result<Option<CompositeWorkflowSession>, StoreError>;
    fn list_sessions(&self, composite_id: Option<Uuid>) -> Result<Vec<CompositeWorkflowSession>, StoreError>;
    fn delete_session(&self, id: Uuid) -> Result<bool, StoreError>;
    fn session_steps(&self, session_id: Uuid) -> Result<Vec<SessionStep>, StoreError>;
    /// `expected_version = None` inserta (conflicto si ya existe la fila
    /// `(session_id, step_id)`); `Some(v)` actualiza sólo si sigue en `v`.
    fn upsert_session_step(&self, row: &SessionStep, expected_version: Option<i64>) -> Result<(), StoreError>;

    /// Sonda de conectividad para `/ping`.
    fn ping(&self) -> Result<(), StoreError>;
}

pub trait NoteStore: Send + Sync {
    fn list_notes(&self) -> Result<Vec<Note>, StoreError>;
    fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError>;
    fn insert_note(&self, note: &Note) -> Result<(), StoreError>;
    fn update_note(&self, note: &Note) -> Result<bool, StoreError>;
    fn delete_note(&self, id: Uuid) -> Result<bool, StoreError>;
}

impl<T: MissionStore + ?Sized> MissionStore for Arc<T> {
    fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        (**self).list_workflows()
    }
    fn get_workflow(&self, id: Uuid) -> Result<Option<Workflow>, StoreError> {
        (**self).get_workflow(id)
    }
    fn insert_workflow(&self, workflow: &Workflow, steps: &[Step]) -> Result<(), StoreError> {
        (**self).insert_workflow(workflow, steps)
    }
    fn delete_workflow(&self, id: Uuid) -> Result<bool, StoreError> {
        (**self).delete_workflow(id)
    }
    fn workflow_steps(&self, workflow_id: Uuid) -> Result<Vec<Step>, StoreError> {
        (**self).workflow_steps(workflow_id)
    }
    fn commit_workflow(&self, commit: &WorkflowCommit) -> Result<(), StoreError> {
        (**self).commit_workflow(commit)
    }
    fn get_steps(&self, ids: &[Uuid]) -> Result<Vec<Step>, StoreError> {
        (**self).get_steps(ids)
    }
    fn active_workflow_id(&self) -> Result<Option<Uuid>, StoreError> {
        (**self).active_workflow_id()
    }
    fn set_active_workflow(&self, id: Uuid) -> Result<(), StoreError> {
        (**self).set_active_workflow(id)
    }
    fn list_composites(&self) -> Result<Vec<CompositeWorkflow>, StoreError> {
        (**self).list_composites()
    }
    fn get_composite(&self, id: Uuid) -> Result<Option<CompositeWorkflow>, StoreError> {
        (**self).get_composite(id)
    }
    fn insert_composite(&self,
                        composite: &CompositeWorkflow,
                        template_steps: &[Step],
                        items: &[CompositeWorkflowItem])
                        -> Result<(), StoreError> {
        (**self).insert_composite(composite, template_steps, items)
    }
    fn delete_composite(&self, id: Uuid) -> Result<bool, StoreError> {
        (**self).delete_composite(id)
    }
    fn composite_items(&self, composite_id: Uuid) -> Result<Vec<CompositeWorkflowItem>, StoreError> {
        (**self).composite_items(composite_id)
    }
    fn insert_session(&self, session: &CompositeWorkflowSession) -> Result<(), StoreError> {
        (**self).insert_session(session)
    }
    fn get_session(&self, id: Uuid) -> Result<Option<CompositeWorkflowSession>, StoreError> {
        (**self).get_session(id)
    }
    fn list_sessions(&self, composite_id: Option<Uuid>) -> Result<Vec<CompositeWorkflowSession>, StoreError> {
        (**self).list_sessions(composite_id)
    }
    fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
        (**self).delete_session(id)
    }
    fn session_steps(&self, session_id: Uuid) -> Result<Vec<SessionStep>, StoreError> {
        (**self).session_steps(session_id)
    }
    fn upsert_session_step(&self, row: &SessionStep, expected_version: Option<i64>) -> Result<(), StoreError> {
        (**self).upsert_session_step(row, expected_version)
    }
    fn ping(&self) -> Result<(), StoreError> {
        (**self).ping()
    }
}
