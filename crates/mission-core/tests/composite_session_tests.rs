use mission_core::{EngineError, InMemoryMissionStore, MissionEngine, MissionStore, NewComposite, NewCompositeItem, NewSession,
                   NewStep, NewWorkflow, ProofSubmission, StepStatus, StepTransition};
use uuid::Uuid;

use StepStatus::{Active, Completed, Locked};

fn engine() -> MissionEngine<InMemoryMissionStore> {
    MissionEngine::new(InMemoryMissionStore::new())
}

fn three_template_composite(engine: &MissionEngine<InMemoryMissionStore>) -> (Uuid, Vec<Uuid>) {
    let detail = engine.create_composite(NewComposite { name: "release".into(),
                                                        items: vec![NewCompositeItem::template(NewStep::named("s1"), 0),
                                                                    NewCompositeItem::template(NewStep::named("s2"), 1),
                                                                    NewCompositeItem::template(NewStep::named("s3"), 2)] })
                       .unwrap();
    let ids = detail.steps.iter().map(|s| s.id).collect();
    (detail.composite.id, ids)
}

#[test]
fn sessions_progress_independently() {
    let engine = engine();
    let (composite_id, steps) = three_template_composite(&engine);
    let a = engine.create_session(composite_id, NewSession::default()).unwrap();
    let b = engine.create_session(composite_id,
                                  NewSession { name: Some("b".into()),
                                               owner_id: Some("user-2".into()) })
                  .unwrap();
    assert_eq!(a.statuses(), vec![Active, Locked, Locked]);

    engine.submit_session_step(a.session.id, steps[0], StepTransition::complete()).unwrap();
    let err = engine.submit_session_step(a.session.id, steps[1], StepTransition::activate()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { from: Active, to: Active, .. }));
    let view_a = engine.submit_session_step(a.session.id, steps[1], StepTransition::complete()).unwrap();

    assert_eq!(view_a.statuses(), vec![Completed, Completed, Active]);
    assert_eq!(view_a.completed_steps, 2);
    assert_eq!(view_a.total_steps, 3);
    assert!(view_a.steps[0].overridden && !view_a.steps[2].overridden);

    let view_b = engine.get_session_view(b.session.id).unwrap();
    assert_eq!(view_b.statuses(), vec![Active, Locked, Locked]);
    assert_eq!(view_b.session.owner_id.as_deref(), Some("user-2"));

    let templates = engine.store().get_steps(&steps).unwrap();
    assert!(templates.iter().all(|s| s.status == Locked && !s.is_completed && s.completed_at.is_none()));
}

#[test]
fn locked_session_step_waits_for_its_predecessor() {
    let engine = engine();
    let (composite_id, steps) = three_template_composite(&engine);
    let session = engine.create_session(composite_id, NewSession::default()).unwrap().session.id;

    let err = engine.submit_session_step(session, steps[1], StepTransition::activate()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { from: Locked, to: Active, .. }));
    let err = engine.submit_session_step(session, steps[2], StepTransition::complete()).unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { from: Locked, to: Completed, .. }));
    assert!(engine.store().session_steps(session).unwrap().is_empty());
}

#[test]
fn foreign_steps_are_rejected() {
    let engine = engine();
    let (composite_id, _) = three_template_composite(&engine);
    let session = engine.create_session(composite_id, NewSession::default()).unwrap().session.id;
    let stray = Uuid::new_v4();

    let err = engine.submit_session_step(session, stray, StepTransition::complete()).unwrap_err();
    assert_eq!(err,
               EngineError::StepNotInComposite { step_id: stray,
                                                 composite_id });
    assert!(matches!(engine.submit_session_step(Uuid::new_v4(), stray, StepTransition::complete()),
                     Err(EngineError::NotFound { entity: "session", .. })));
}

#[test]
fn composites_can_borrow_steps_from_workflows() {
    let engine = engine();
    let workflow = engine.create_workflow(NewWorkflow { name: "source".into(),
                                                        steps: vec![NewStep { name: "review".into(),
                                                                              requires_approval: true,
                                                                              proof_required: true,
                                                                              ..NewStep::default() }],
                                                        ..NewWorkflow::default() })
                         .unwrap();
    let borrowed = workflow.steps[0].id;
    let detail = engine.create_composite(NewComposite { name: "mixed".into(),
                                                        items: vec![NewCompositeItem::template(NewStep::named("intro"), 5),
                                                                    NewCompositeItem::existing(borrowed, 1)] })
                       .unwrap();
    assert_eq!(detail.steps[0].id, borrowed);
    assert_eq!(detail.items.iter().map(|i| i.order_index).collect::<Vec<_>>(), vec![1, 5]);

    let session = engine.create_session(detail.composite.id, NewSession::default()).unwrap().session.id;
    assert!(matches!(engine.submit_session_step(session, borrowed, StepTransition::complete()),
                     Err(EngineError::InvalidTransition { .. })));
    let view = engine.submit_session_step(session,
                                          borrowed,
                                          StepTransition::complete().with_proof(ProofSubmission::content("ok")))
                     .unwrap();
    assert_eq!(view.statuses(), vec![Completed, Active]);

    let source = engine.get_workflow(workflow.workflow.id).unwrap();
    assert_eq!(source.steps[0].status, Active);
    assert!(!source.steps[0].proof.has_payload());
}

#[test]
fn composite_creation_checks_references() {
    let engine = engine();
    let missing = Uuid::new_v4();
    let err = engine.create_composite(NewComposite { name: "broken".into(),
                                                     items: vec![NewCompositeItem::existing(missing, 0)] })
                    .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { entity: "step", .. }));
    assert!(engine.list_composites().unwrap().is_empty());
    assert!(matches!(engine.create_session(missing, NewSession::default()),
                     Err(EngineError::NotFound { entity: "composite", .. })));
}

#[test]
fn deleting_a_composite_removes_its_sessions() {
    let engine = engine();
    let (composite_id, steps) = three_template_composite(&engine);
    let session = engine.create_session(composite_id, NewSession::default()).unwrap().session.id;
    engine.submit_session_step(session, steps[0], StepTransition::complete()).unwrap();
    assert_eq!(engine.list_sessions(Some(composite_id)).unwrap().len(), 1);

    engine.delete_composite(composite_id).unwrap();
    assert!(engine.list_sessions(None).unwrap().is_empty());
    assert!(matches!(engine.get_session_view(session), Err(EngineError::NotFound { .. })));
    assert!(engine.store().get_steps(&steps).unwrap().is_empty());
    assert!(matches!(engine.delete_composite(composite_id), Err(EngineError::NotFound { .. })));
}

#[test]
fn deleting_a_session_keeps_the_composite() {
    let engine = engine();
    let (composite_id, _) = three_template_composite(&engine);
    let session = engine.create_session(composite_id, NewSession::default()).unwrap().session.id;
    engine.delete_session(session).unwrap();
    assert!(matches!(engine.delete_session(session), Err(EngineError::NotFound { entity: "session", .. })));
    assert_eq!(engine.get_composite(composite_id).unwrap().items.len(), 3);
}
