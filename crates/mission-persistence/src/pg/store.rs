use std::collections::HashMap;

use diesel::pg::PgConnection;
use diesel::prelude::*;
use log::debug;
use mission_core::model::{CompositeWorkflow, CompositeWorkflowItem, CompositeWorkflowSession, Note, SessionStep, Step,
                          Workflow};
use mission_core::{MissionStore, NoteStore, StoreError, WorkflowCommit};
use uuid::Uuid;

use super::rows::{CompositeRow, ItemRow, NoteRow, SessionRow, SessionStepChanges, SessionStepRow, StepRow,
                  StepStateChanges, WorkflowRow};
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{app_settings, composite_workflow_items, composite_workflow_session_steps, composite_workflow_sessions,
                    composite_workflows, notes, workflow_steps, workflows};

const SETTINGS_ROW: i16 = 1;

/// Store Postgres. Comparte semántica con `InMemoryMissionStore`; las
/// cascadas las resuelven las FK del esquema.
pub struct PgMissionStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgMissionStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn read<T, F>(&self, mut f: F) -> Result<T, StoreError>
        where F: FnMut(&mut PgConnection) -> Result<T, PersistenceError>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            f(&mut conn)
        }).map_err(StoreError::from)
    }

    fn write<T, F>(&self, f: F) -> Result<T, StoreError>
        where F: FnOnce(&mut PgConnection) -> Result<T, PersistenceError>
    {
        let mut conn = self.provider.connection()?;
        conn.build_transaction()
            .read_write()
            .run(f)
            .map_err(StoreError::from)
    }
}

impl<P: ConnectionProvider> MissionStore for PgMissionStore<P> {
    fn list_workflows(&self) -> Result<Vec<Workflow>, StoreError> {
        let rows: Vec<WorkflowRow> = self.read(|conn| {
                                             workflows::table.order((workflows::created_at.asc(), workflows::id.asc()))
                                                             .select(WorkflowRow::as_select())
                                                             .load(conn)
                                                             .map_err(PersistenceError::from)
                                         })?;
        rows.into_iter()
            .map(|r| r.into_model().map_err(StoreError::from))
            .collect()
    }

    fn get_workflow(&self, id: Uuid) -> Result<Option<Workflow>, StoreError> {
        let row: Option<WorkflowRow> = self.read(|conn| {
                                               workflows::table.find(id)
                                                               .select(WorkflowRow::as_select())
                                                               .first(conn)
                                                               .optional()
                                                               .map_err(PersistenceError::from)
                                           })?;
        row.map(WorkflowRow::into_model).transpose().map_err(StoreError::from)
    }

    fn insert_workflow(&self, workflow: &Workflow, steps: &[Step]) -> Result<(), StoreError> {
        let row = WorkflowRow::from_model(workflow);
        let step_rows = steps.iter().map(StepRow::from_model).collect::<Result<Vec<_>, _>>()?;
        self.write(|tx| {
                diesel::insert_into(workflows::table).values(&row).execute(tx)?;
                if !step_rows.is_empty() {
                    diesel::insert_into(workflow_steps::table).values(&step_rows).execute(tx)?;
                }
                Ok(())
            })?;
        debug!("insert_workflow id={} steps={}", workflow.id, steps.len());
        Ok(())
    }

    fn delete_workflow(&self, id: Uuid) -> Result<bool, StoreError> {
        self.write(|tx| Ok(diesel::delete(workflows::table.find(id)).execute(tx)? > 0))
    }

    fn workflow_steps(&self, workflow_id: Uuid) -> Result<Vec<Step>, StoreError> {
        let rows: Vec<StepRow> = self.read(|conn| {
                                         workflow_steps::table.filter(workflow_steps::workflow_id.eq(workflow_id))
                                                              .order(workflow_steps::step_number.asc())
                                                              .select(StepRow::as_select())
                                                              .load(conn)
                                                              .map_err(PersistenceError::from)
                                     })?;
        rows.into_iter()
            .map(|r| r.into_model().map_err(StoreError::from))
            .collect()
    }

    fn commit_workflow(&self, commit: &WorkflowCommit) -> Result<(), StoreError> {
        let id = commit.workflow.id;
        let expected = commit.expected_version;
        let changes = commit.steps
                            .iter()
                            .map(|s| StepStateChanges::from_model(s).map(|c| (s.id, c)))
                            .collect::<Result<Vec<_>, _>>()?;
        self.write(|tx| {
                let updated = diesel::update(workflows::table.filter(workflows::id.eq(id))
                                                             .filter(workflows::version.eq(expected)))
                                  .set((workflows::current_step.eq(commit.workflow.current_step),
                                        workflows::status.eq(commit.workflow.status.as_str()),
                                        workflows::version.eq(expected + 1)))
                                  .execute(tx)?;
                if updated == 0 {
                    let exists = workflows::table.find(id)
                                                 .select(workflows::id)
                                                 .first::<Uuid>(tx)
                                                 .optional()?
                                                 .is_some();
                    return Err(if exists {
                                   PersistenceError::VersionConflict(format!("workflow {id} moved past version {expected}"))
                               } else {
                                   PersistenceError::NotFound
                               });
                }
                for (step_id, change) in &changes {
                    let n = diesel::update(workflow_steps::table.filter(workflow_steps::id.eq(step_id))
                                                                .filter(workflow_steps::workflow_id.eq(id)))
                                .set(change)
                                .execute(tx)?;
                    if n == 0 {
                        return Err(PersistenceError::NotFound);
                    }
                }
                Ok(())
            })?;
        debug!("commit_workflow id={id} version={} current_step={}",
               expected + 1,
               commit.workflow.current_step);
        Ok(())
    }

    fn get_steps(&self, ids: &[Uuid]) -> Result<Vec<Step>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let wanted = ids.to_vec();
        let rows: Vec<StepRow> = self.read(|conn| {
                                         workflow_steps::table.filter(workflow_steps::id.eq_any(wanted.clone()))
                                                              .select(StepRow::as_select())
                                                              .load(conn)
                                                              .map_err(PersistenceError::from)
                                     })?;
        let mut by_id: HashMap<Uuid, Step> = HashMap::with_capacity(rows.len());
        for row in rows {
            let step = row.into_model()?;
            by_id.insert(step.id, step);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    fn active_workflow_id(&self) -> Result<Option<Uuid>, StoreError> {
        let pointer: Option<Option<Uuid>> = self.read(|conn| {
                                                    app_settings::table.find(SETTINGS_ROW)
                                                                       .select(app_settings::active_workflow_id)
                                                                       .first(conn)
                                                                       .optional()
                                                                       .map_err(PersistenceError::from)
                                                })?;
        Ok(pointer.flatten())
    }

    fn set_active_workflow(&self, id: Uuid) -> Result<(), StoreError> {
        self.write(|tx| {
                let exists = workflows::table.find(id)
                                             .select(workflows::id)
                                             .first::<Uuid>(tx)
                                             .optional()?
                                             .is_some();
                if !exists {
                    return Err(PersistenceError::NotFound);
                }
                diesel::insert_into(app_settings::table).values((app_settings::id.eq(SETTINGS_ROW),
                                                                 app_settings::active_workflow_id.eq(Some(id))))
                                                        .on_conflict(app_settings::id)
                                                        .do_update()
                                                        .set(app_settings::active_workflow_id.eq(Some(id)))
                                                        .execute(tx)?;
                Ok(())
            })
    }

    fn list_composites(&self) -> Result<Vec<CompositeWorkflow>, StoreError> {
        let rows: Vec<CompositeRow> = self.read(|conn| {
                                              composite_workflows::table.order((composite_workflows::created_at.asc(),
                                                                                composite_workflows::id.asc()))
                                                                        .select(CompositeRow::as_select())
                                                                        .load(conn)
                                                                        .map_err(PersistenceError::from)
                                          })?;
        Ok(rows.into_iter().map(CompositeWorkflow::from).collect())
    }

    fn get_composite(&self, id: Uuid) -> Result<Option<CompositeWorkflow>, StoreError> {
        let row: Option<CompositeRow> = self.read(|conn| {
                                                composite_workflows::table.find(id)
                                                                          .select(CompositeRow::as_select())
                                                                          .first(conn)
                                                                          .optional()
                                                                          .map_err(PersistenceError::from)
                                            })?;
        Ok(row.map(CompositeWorkflow::from))
    }

    fn insert_composite(&self,
                        composite: &CompositeWorkflow,
                        template_steps: &[Step],
                        items: &[CompositeWorkflowItem])
                        -> Result<(), StoreError> {
        let row = CompositeRow::from(composite);
        let step_rows = template_steps.iter().map(StepRow::from_model).collect::<Result<Vec<_>, _>>()?;
        let item_rows: Vec<ItemRow> = items.iter().map(ItemRow::from).collect();
        self.write(|tx| {
                diesel::insert_into(composite_workflows::table).values(&row).execute(tx)?;
                if !step_rows.is_empty() {
                    diesel::insert_into(workflow_steps::table).values(&step_rows).execute(tx)?;
                }
                if !item_rows.is_empty() {
                    diesel::insert_into(composite_workflow_items::table).values(&item_rows).execute(tx)?;
                }
                Ok(())
            })
    }

    fn delete_composite(&self, id: Uuid) -> Result<bool, StoreError> {
        self.write(|tx| Ok(diesel::delete(composite_workflows::table.find(id)).execute(tx)? > 0))
    }

    fn composite_items(&self, composite_id: Uuid) -> Result<Vec<CompositeWorkflowItem>, StoreError> {
        let rows: Vec<ItemRow> = self.read(|conn| {
                                         composite_workflow_items::table.filter(composite_workflow_items::composite_id.eq(composite_id))
                                                                        .order((composite_workflow_items::order_index.asc(),
                                                                                composite_workflow_items::id.asc()))
                                                                        .select(ItemRow::as_select())
                                                                        .load(conn)
                                                                        .map_err(PersistenceError::from)
                                     })?;
        Ok(rows.into_iter().map(CompositeWorkflowItem::from).collect())
    }

    fn insert_session(&self, session: &CompositeWorkflowSession) -> Result<(), StoreError> {
        let row = SessionRow::from(session);
        self.write(|tx| {
                diesel::insert_into(composite_workflow_sessions::table).values(&row).execute(tx)?;
                Ok(())
            })
    }

    fn get_session(&self, id: Uuid) -> Result<Option<CompositeWorkflowSession>, StoreError> {
        let row: Option<SessionRow> = self.read(|conn| {
                                              composite_workflow_sessions::table.find(id)
                                                                                .select(SessionRow::as_select())
                                                                                .first(conn)
                                                                                .optional()
                                                                                .map_err(PersistenceError::from)
                                          })?;
        Ok(row.map(CompositeWorkflowSession::from))
    }

    fn list_sessions(&self, composite_id: Option<Uuid>) -> Result<Vec<CompositeWorkflowSession>, StoreError> {
        let rows: Vec<SessionRow> = self.read(|conn| {
                                            let mut query = composite_workflow_sessions::table
                                                .select(SessionRow::as_select())
                                                .order((composite_workflow_sessions::created_at.asc(),
                                                        composite_workflow_sessions::id.asc()))
                                                .into_boxed();
                                            if let Some(cid) = composite_id {
                                                query = query.filter(composite_workflow_sessions::composite_id.eq(cid));
                                            }
                                            query.load(conn).map_err(PersistenceError::from)
                                        })?;
        Ok(rows.into_iter().map(CompositeWorkflowSession::from).collect())
    }

    fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
        self.write(|tx| Ok(diesel::delete(composite_workflow_sessions::table.find(id)).execute(tx)? > 0))
    }

    fn session_steps(&self, session_id: Uuid) -> Result<Vec<SessionStep>, StoreError> {
        let rows: Vec<SessionStepRow> =
            self.read(|conn| {
                    composite_workflow_session_steps::table
                        .filter(composite_workflow_session_steps::session_id.eq(session_id))
                        .select(SessionStepRow::as_select())
                        .load(conn)
                        .map_err(PersistenceError::from)
                })?;
        rows.into_iter()
            .map(|r| r.into_model().map_err(StoreError::from))
            .collect()
    }

    fn upsert_session_step(&self, row: &SessionStep, expected_version: Option<i64>) -> Result<(), StoreError> {
        let db_row = SessionStepRow::from_model(row)?;
        self.write(|tx| {
                match expected_version {
                    None => {
                        diesel::insert_into(composite_workflow_session_steps::table).values(&db_row)
                                                                                   .execute(tx)?;
                    }
                    Some(version) => {
                        let n = diesel::update(
                            composite_workflow_session_steps::table
                                .filter(composite_workflow_session_steps::session_id.eq(db_row.session_id))
                                .filter(composite_workflow_session_steps::step_id.eq(db_row.step_id))
                                .filter(composite_workflow_session_steps::version.eq(version)),
                        ).set(SessionStepChanges::from(&db_row))
                         .execute(tx)?;
                        if n == 0 {
                            return Err(PersistenceError::VersionConflict(format!("session step ({}, {}) moved past version {version}",
                                                                                 db_row.session_id, db_row.step_id)));
                        }
                    }
                }
                Ok(())
            })
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.read(|conn| {
                diesel::sql_query("SELECT 1").execute(conn)
                                             .map(|_| ())
                                             .map_err(PersistenceError::from)
            })
    }
}

impl<P: ConnectionProvider> NoteStore for PgMissionStore<P> {
    fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        let rows: Vec<NoteRow> = self.read(|conn| {
                                         notes::table.order((notes::created_at.asc(), notes::id.asc()))
                                                     .select(NoteRow::as_select())
                                                     .load(conn)
                                                     .map_err(PersistenceError::from)
                                     })?;
        Ok(rows.into_iter().map(Note::from).collect())
    }

    fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let row: Option<NoteRow> = self.read(|conn| {
                                           notes::table.find(id)
                                                       .select(NoteRow::as_select())
                                                       .first(conn)
                                                       .optional()
                                                       .map_err(PersistenceError::from)
                                       })?;
        Ok(row.map(Note::from))
    }

    fn insert_note(&self, note: &Note) -> Result<(), StoreError> {
        let row = NoteRow::from(note);
        self.write(|tx| {
                diesel::insert_into(notes::table).values(&row).execute(tx)?;
                Ok(())
            })
    }

    fn update_note(&self, note: &Note) -> Result<bool, StoreError> {
        self.write(|tx| {
                let n = diesel::update(notes::table.find(note.id)).set((notes::title.eq(&note.title),
                                                                         notes::content.eq(&note.content),
                                                                         notes::updated_at.eq(note.updated_at)))
                                                                  .execute(tx)?;
                Ok(n > 0)
            })
    }

    fn delete_note(&self, id: Uuid) -> Result<bool, StoreError> {
        self.write(|tx| Ok(diesel::delete(notes::table.find(id)).execute(tx)? > 0))
    }
}
