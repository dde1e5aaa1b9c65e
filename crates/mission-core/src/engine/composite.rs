//! Composites y sesiones colaborativas.
//!
//! Un composite ordena steps plantilla (propios o de otros workflows). Cada
//! sesión guarda sólo los overrides que ha tocado; el resto del estado se
//! infiere: el primer step sin override está `active`, los siguientes
//! quedan `locked` hasta que el anterior se completa. Las plantillas nunca
//! se modifican desde una sesión.

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::model::{CompositeDetail, CompositeWorkflow, CompositeWorkflowItem, CompositeWorkflowSession, NewComposite,
                   NewSession, Proof, SessionStep, SessionStepView, SessionView, Step};
use crate::repo::MissionStore;
use crate::step::{apply_transition, StepGate, StepStatus, StepTransition};

use super::MissionEngine;

/// Orden canónico de los items: `order_index`, desempate por `id`.
pub fn order_items(items: &mut [CompositeWorkflowItem]) {
    items.sort_by(|a, b| a.order_index.cmp(&b.order_index).then_with(|| a.id.cmp(&b.id)));
}

/// Resuelve el estado efectivo de cada item para una sesión.
///
/// `items` debe venir en orden canónico. `templates` y `overrides` se indexan
/// por `step_id`.
pub fn resolve_effective(items: &[CompositeWorkflowItem],
                         templates: &HashMap<Uuid, Step>,
                         overrides: &HashMap<Uuid, SessionStep>)
                         -> Result<Vec<SessionStepView>, EngineError> {
    let mut views: Vec<SessionStepView> = Vec::with_capacity(items.len());
    for item in items {
        let template = templates.get(&item.step_id)
                                .ok_or_else(|| EngineError::not_found("step", item.step_id))?;
        let (status, proof, completed_at, overridden) = match overrides.get(&item.step_id) {
            Some(row) => (row.status, row.proof.clone(), row.completed_at, true),
            None => {
                let unlocked = views.last().map_or(true, |prev| prev.status == StepStatus::Completed);
                let status = if unlocked { StepStatus::Active } else { StepStatus::Locked };
                (status, Proof::default(), None, false)
            }
        };
        views.push(SessionStepView { item_id: item.id,
                                     order_index: item.order_index,
                                     step_id: template.id,
                                     workflow_id: template.workflow_id,
                                     composite_id: template.composite_id,
                                     step_number: template.step_number,
                                     name: template.name.clone(),
                                     description: template.description.clone(),
                                     requires_approval: template.requires_approval,
                                     proof_required: template.proof_required,
                                     status,
                                     is_completed: status == StepStatus::Completed,
                                     proof,
                                     completed_at,
                                     overridden });
    }
    Ok(views)
}

fn validate_new_composite(new: &NewComposite) -> Result<(), EngineError> {
    if new.name.trim().is_empty() {
        return Err(EngineError::Validation("name is required".into()));
    }
    if new.items.is_empty() {
        return Err(EngineError::Validation("a composite needs at least one item".into()));
    }
    let mut order = HashSet::new();
    let mut referenced = HashSet::new();
    for item in &new.items {
        match (&item.step_id, &item.step) {
            (Some(id), None) => {
                if !referenced.insert(*id) {
                    return Err(EngineError::Validation(format!("step {id} appears twice")));
                }
            }
            (None, Some(draft)) => draft.validate()?,
            _ => {
                return Err(EngineError::Validation(format!("item {} must carry exactly one of stepId or step",
                                                           item.order_index)))
            }
        }
        if !order.insert(item.order_index) {
            return Err(EngineError::Validation(format!("duplicate orderIndex {}", item.order_index)));
        }
    }
    Ok(())
}

impl<S> MissionEngine<S> where S: MissionStore
{
    pub fn create_composite(&self, new: NewComposite) -> Result<CompositeDetail, EngineError> {
        validate_new_composite(&new)?;

        let referenced: Vec<Uuid> = new.items.iter().filter_map(|i| i.step_id).collect();
        let found = self.store.get_steps(&referenced)?;
        if let Some(missing) = referenced.iter().find(|id| !found.iter().any(|s| s.id == **id)) {
            return Err(EngineError::not_found("step", missing));
        }

        let composite = CompositeWorkflow { id: Uuid::new_v4(),
                                            name: new.name.trim().to_string(),
                                            created_at: self.now() };
        let mut drafts = new.items;
        drafts.sort_by_key(|i| i.order_index);

        let mut templates = Vec::new();
        let mut items = Vec::with_capacity(drafts.len());
        for (draft, position) in drafts.iter().zip(1..) {
            let step_id = match (&draft.step_id, &draft.step) {
                (Some(id), _) => *id,
                (None, Some(step)) => {
                    let template = Step::for_composite(composite.id, step, position);
                    let id = template.id;
                    templates.push(template);
                    id
                }
                (None, None) => {
                    return Err(EngineError::Validation(format!("item {} has no step", draft.order_index)))
                }
            };
            items.push(CompositeWorkflowItem { id: Uuid::new_v4(),
                                               composite_id: composite.id,
                                               step_id,
                                               order_index: draft.order_index });
        }

        self.store.insert_composite(&composite, &templates, &items)?;
        info!("composite created id={} items={} templates={}", composite.id, items.len(), templates.len());
        self.get_composite(composite.id)
    }

    pub fn list_composites(&self) -> Result<Vec<CompositeWorkflow>, EngineError> {
        Ok(self.store.list_composites()?)
    }

    pub fn get_composite(&self, id: Uuid) -> Result<CompositeDetail, EngineError> {
        let composite = self.store
                            .get_composite(id)?
                            .ok_or_else(|| EngineError::not_found("composite", id))?;
        let (items, templates) = self.load_items(id)?;
        let steps = items.iter()
                         .filter_map(|item| templates.get(&item.step_id).cloned())
                         .collect();
        Ok(CompositeDetail { composite, items, steps })
    }

    pub fn delete_composite(&self, id: Uuid) -> Result<(), EngineError> {
        if !self.store.delete_composite(id)? {
            return Err(EngineError::not_found("composite", id));
        }
        info!("composite deleted id={id}");
        Ok(())
    }

    /// Crea una sesión sin overrides: su vista es la inferida por defecto.
    pub fn create_session(&self, composite_id: Uuid, new: NewSession) -> Result<SessionView, EngineError> {
        if self.store.get_composite(composite_id)?.is_none() {
            return Err(EngineError::not_found("composite", composite_id));
        }
        let session = CompositeWorkflowSession { id: Uuid::new_v4(),
                                                 composite_id,
                                                 name: new.name.filter(|n| !n.trim().is_empty()),
                                                 owner_id: new.owner_id,
                                                 created_at: self.now() };
        self.store.insert_session(&session)?;
        info!("session created id={} composite={composite_id}", session.id);
        self.get_session_view(session.id)
    }

    pub fn list_sessions(&self, composite_id: Option<Uuid>) -> Result<Vec<CompositeWorkflowSession>, EngineError> {
        Ok(self.store.list_sessions(composite_id)?)
    }

    pub fn delete_session(&self, id: Uuid) -> Result<(), EngineError> {
        if !self.store.delete_session(id)? {
            return Err(EngineError::not_found("session", id));
        }
        info!("session deleted id={id}");
        Ok(())
    }

    pub fn get_session_view(&self, session_id: Uuid) -> Result<SessionView, EngineError> {
        let session = self.store
                          .get_session(session_id)?
                          .ok_or_else(|| EngineError::not_found("session", session_id))?;
        let composite = self.store
                            .get_composite(session.composite_id)?
                            .ok_or_else(|| EngineError::not_found("composite", session.composite_id))?;
        let (items, templates) = self.load_items(composite.id)?;
        let overrides = self.load_overrides(session_id)?;
        let steps = resolve_effective(&items, &templates, &overrides)?;
        let completed_steps = steps.iter().filter(|s| s.is_completed).count();
        let total_steps = steps.len();
        Ok(SessionView { session,
                         composite,
                         steps,
                         completed_steps,
                         total_steps })
    }

    /// Aplica una transición al step `step_id` dentro de la sesión. Sólo se
    /// escribe la fila de override de esa sesión.
    pub fn submit_session_step(&self,
                               session_id: Uuid,
                               step_id: Uuid,
                               transition: StepTransition)
                               -> Result<SessionView, EngineError> {
        let session = self.store
                          .get_session(session_id)?
                          .ok_or_else(|| EngineError::not_found("session", session_id))?;
        let (items, templates) = self.load_items(session.composite_id)?;
        let position = items.iter()
                            .position(|item| item.step_id == step_id)
                            .ok_or(EngineError::StepNotInComposite { step_id,
                                                                     composite_id: session.composite_id })?;
        let overrides = self.load_overrides(session_id)?;
        let views = resolve_effective(&items, &templates, &overrides)?;

        let view = &views[position];
        let gate = StepGate { predecessor: position.checked_sub(1).map(|p| views[p].status),
                              requires_approval: view.requires_approval,
                              proof_required: view.proof_required };
        let state = apply_transition(&view.state(), &gate, &transition, self.now())?;

        let existing = overrides.get(&step_id);
        let row = SessionStep { id: existing.map_or_else(Uuid::new_v4, |r| r.id),
                                session_id,
                                step_id,
                                status: state.status,
                                proof: state.proof,
                                completed_at: state.completed_at,
                                version: existing.map_or(0, |r| r.version + 1) };
        self.store.upsert_session_step(&row, existing.map(|r| r.version))?;
        debug!("session step session={session_id} step={step_id} {} -> {} (version {})",
               view.status, row.status, row.version);
        self.get_session_view(session_id)
    }

    fn load_items(&self, composite_id: Uuid) -> Result<(Vec<CompositeWorkflowItem>, HashMap<Uuid, Step>), EngineError> {
        let mut items = self.store.composite_items(composite_id)?;
        order_items(&mut items);
        let ids: Vec<Uuid> = items.iter().map(|i| i.step_id).collect();
        let templates = self.store
                            .get_steps(&ids)?
                            .into_iter()
                            .map(|s| (s.id, s))
                            .collect();
        Ok((items, templates))
    }

    fn load_overrides(&self, session_id: Uuid) -> Result<HashMap<Uuid, SessionStep>, EngineError> {
        Ok(self.store
               .session_steps(session_id)?
               .into_iter()
               .map(|row| (row.step_id, row))
               .collect())
    }
}
