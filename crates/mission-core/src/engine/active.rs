//! Selector del workflow activo.
//!
//! Hay como mucho un workflow activo: el store guarda un único puntero, así
//! que activar uno desactiva implícitamente al anterior en la misma
//! escritura. `is_active` en los workflows devueltos es una proyección de
//! ese puntero, nunca un dato almacenado por fila.

use log::info;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::model::{Workflow, WorkflowDetail};
use crate::repo::{MissionStore, StoreError};

use super::MissionEngine;

impl<S> MissionEngine<S> where S: MissionStore
{
    pub(crate) fn project_active(mut workflow: Workflow, active: Option<Uuid>) -> Workflow {
        workflow.is_active = active == Some(workflow.id);
        workflow
    }

    pub fn set_active(&self, id: Uuid) -> Result<WorkflowDetail, EngineError> {
        self.store.set_active_workflow(id).map_err(|err| match err {
                                               StoreError::NotFound(_) => EngineError::not_found("workflow", id),
                                               other => other.into(),
                                           })?;
        info!("active workflow set id={id}");
        self.get_workflow(id)
    }

    /// `None` si no hay ninguno activo (o si el activo fue borrado).
    pub fn get_active(&self) -> Result<Option<WorkflowDetail>, EngineError> {
        let Some(id) = self.store.active_workflow_id()? else {
            return Ok(None);
        };
        match self.get_workflow(id) {
            Ok(detail) => Ok(Some(detail)),
            Err(EngineError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
