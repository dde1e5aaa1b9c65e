//! Paridad del store Postgres con el backend en memoria (requiere
//! DATABASE_URL; sin ella los tests se omiten).

mod test_support;

use mission_core::{EngineError, MissionStore, NewComposite, NewCompositeItem, NewSession, NewStep, NewWorkflow, NoteDraft,
                   NoteStore, ProofSubmission, StepStatus, StepTransition, WorkflowStatus};
use test_support::with_engine;

#[test]
fn workflow_progression_roundtrips_through_postgres() {
    with_engine(|engine| {
        let created = engine.create_workflow(NewWorkflow { name: "pg-progression".into(),
                                                           steps: vec![NewStep { name: "evidence".into(),
                                                                                 requires_approval: true,
                                                                                 proof_required: true,
                                                                                 ..NewStep::default() },
                                                                       NewStep::named("wrap-up")],
                                                           ..NewWorkflow::default() })
                            .expect("create");
        let id = created.workflow.id;
        let first = created.steps[0].id;

        assert!(matches!(engine.advance(id), Err(EngineError::StepNotCompleted { step_number: 1 })));
        assert!(matches!(engine.submit_step(id, first, StepTransition::complete()),
                         Err(EngineError::InvalidTransition { .. })));

        let done = engine.submit_step(id,
                                      first,
                                      StepTransition::complete().with_proof(ProofSubmission::content("photo")))
                         .expect("complete");
        assert_eq!(done.steps[0].status, StepStatus::Completed);
        assert_eq!(done.steps[0].proof.content.as_deref(), Some("photo"));

        let advanced = engine.advance(id).expect("advance");
        assert_eq!(advanced.workflow.current_step, 2);
        assert_eq!(advanced.workflow.version, 2);
        assert_eq!(advanced.steps[1].status, StepStatus::Active);

        let finished = engine.submit_step(id, advanced.steps[1].id, StepTransition::complete()).expect("finish");
        assert_eq!(finished.workflow.status, WorkflowStatus::Completed);

        engine.delete_workflow(id).expect("delete");
        assert!(engine.store().workflow_steps(id).expect("steps").is_empty());
    });
}

#[test]
fn stale_versions_are_rejected() {
    with_engine(|engine| {
        let detail = engine.create_workflow(NewWorkflow { name: "pg-cas".into(),
                                                          total_steps: Some(4),
                                                          ..NewWorkflow::default() })
                           .expect("create");
        let stale = mission_core::engine::plan_advance(&detail.workflow, &detail.steps, chrono::Utc::now()).expect("plan");
        engine.advance(detail.workflow.id).expect("advance");
        let err = engine.store().commit_workflow(&stale).expect_err("stale commit");
        assert!(matches!(err, mission_core::StoreError::Conflict(_)));
        engine.delete_workflow(detail.workflow.id).expect("cleanup");
    });
}

#[test]
fn sessions_override_templates_independently() {
    with_engine(|engine| {
        let composite = engine.create_composite(NewComposite { name: "pg-composite".into(),
                                                               items: vec![NewCompositeItem::template(NewStep::named("s1"), 0),
                                                                           NewCompositeItem::template(NewStep::named("s2"), 1),
                                                                           NewCompositeItem::template(NewStep::named("s3"), 2)] })
                              .expect("composite");
        let cid = composite.composite.id;
        let steps: Vec<_> = composite.steps.iter().map(|s| s.id).collect();
        let a = engine.create_session(cid, NewSession::default()).expect("a").session.id;
        let b = engine.create_session(cid, NewSession::default()).expect("b").session.id;

        engine.submit_session_step(a, steps[0], StepTransition::complete()).expect("a/s1");
        let view_a = engine.submit_session_step(a, steps[1], StepTransition::complete()).expect("a/s2");
        assert_eq!(view_a.statuses(), vec![StepStatus::Completed, StepStatus::Completed, StepStatus::Active]);
        assert_eq!(engine.get_session_view(b).expect("b").statuses(),
                   vec![StepStatus::Active, StepStatus::Locked, StepStatus::Locked]);

        let rows = engine.store().session_steps(a).expect("rows");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.version == 0));
        assert_eq!(engine.list_sessions(Some(cid)).expect("sessions").len(), 2);

        engine.delete_composite(cid).expect("delete");
        assert!(matches!(engine.get_session_view(a), Err(EngineError::NotFound { .. })));
    });
}

#[test]
fn active_pointer_follows_deletes() {
    with_engine(|engine| {
        let id = engine.create_workflow(NewWorkflow { name: "pg-active".into(),
                                                      ..NewWorkflow::default() })
                       .expect("create")
                       .workflow
                       .id;
        assert!(engine.set_active(id).expect("activate").workflow.is_active);
        engine.delete_workflow(id).expect("delete");
        assert_ne!(engine.get_active().expect("active").map(|d| d.workflow.id), Some(id));
        assert!(matches!(engine.set_active(id), Err(EngineError::NotFound { entity: "workflow", .. })));
    });
}

#[test]
fn notes_crud() {
    with_engine(|engine| {
        let store = engine.store();
        let note = NoteDraft { title: "pg-note".into(),
                               content: "body".into() }.into_note(chrono::Utc::now());
        store.insert_note(&note).expect("insert");
        let edited = NoteDraft { title: "pg-note v2".into(),
                                 content: String::new() }.apply_to(&note, chrono::Utc::now());
        assert!(store.update_note(&edited).expect("update"));
        assert_eq!(store.get_note(note.id).expect("get").map(|n| n.title), Some("pg-note v2".into()));
        assert!(store.delete_note(note.id).expect("delete"));
        assert!(!store.delete_note(note.id).expect("delete again"));
        store.ping().expect("ping");
    });
}
