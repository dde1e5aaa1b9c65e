use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use mission_core::{CompositeWorkflowSession, SessionView, StepTransition};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{JsonBody, Path, Query};
use super::{run_blocking, AppState};
use crate::errors::api_error::ApiResult;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilter {
    pub composite_id: Option<Uuid>,
}

pub async fn list(State(state): State<AppState>,
                  Query(filter): Query<SessionFilter>)
                  -> ApiResult<Json<Vec<CompositeWorkflowSession>>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.list_sessions(filter.composite_id)).await.map(Json)
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SessionView>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.get_session_view(id)).await.map(Json)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let engine = state.engine.clone();
    run_blocking(move || engine.delete_session(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_step(State(state): State<AppState>,
                         Path((id, step_id)): Path<(Uuid, Uuid)>,
                         JsonBody(transition): JsonBody<StepTransition>)
                         -> ApiResult<Json<SessionView>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.submit_session_step(id, step_id, transition)).await.map(Json)
}
