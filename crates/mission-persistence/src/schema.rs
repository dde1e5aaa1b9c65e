//! Esquema Diesel (mantenido a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    workflows (id) {
        id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        total_steps -> Int4,
        current_step -> Int4,
        status -> Text,
        priority -> Text,
        version -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    composite_workflows (id) {
        id -> Uuid,
        name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    workflow_steps (id) {
        id -> Uuid,
        workflow_id -> Nullable<Uuid>,
        composite_id -> Nullable<Uuid>,
        step_number -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        status -> Text,
        is_completed -> Bool,
        requires_approval -> Bool,
        proof_required -> Bool,
        proof -> Jsonb,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    composite_workflow_items (id) {
        id -> Uuid,
        composite_id -> Uuid,
        step_id -> Uuid,
        order_index -> Int4,
    }
}

diesel::table! {
    composite_workflow_sessions (id) {
        id -> Uuid,
        composite_id -> Uuid,
        name -> Nullable<Text>,
        owner_id -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    composite_workflow_session_steps (id) {
        id -> Uuid,
        session_id -> Uuid,
        step_id -> Uuid,
        status -> Text,
        proof -> Jsonb,
        completed_at -> Nullable<Timestamptz>,
        version -> Int8,
    }
}

diesel::table! {
    app_settings (id) {
        id -> Int2,
        active_workflow_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    notes (id) {
        id -> Uuid,
        title -> Text,
        content -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(workflow_steps -> workflows (workflow_id));
diesel::joinable!(composite_workflow_items -> composite_workflows (composite_id));
diesel::joinable!(composite_workflow_items -> workflow_steps (step_id));
diesel::joinable!(composite_workflow_sessions -> composite_workflows (composite_id));
diesel::joinable!(composite_workflow_session_steps -> composite_workflow_sessions (session_id));
diesel::joinable!(composite_workflow_session_steps -> workflow_steps (step_id));
diesel::joinable!(app_settings -> workflows (active_workflow_id));

diesel::allow_tables_to_appear_in_same_query!(
    workflows,
    composite_workflows,
    workflow_steps,
    composite_workflow_items,
    composite_workflow_sessions,
    composite_workflow_session_steps,
    app_settings,
    notes,
);
