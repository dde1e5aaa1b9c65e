use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use mission_core::{NewWorkflow, StepTransition, Workflow, WorkflowDetail};
use uuid::Uuid;

use super::extract::{JsonBody, Path};
use super::{run_blocking, AppState};
use crate::errors::api_error::ApiResult;

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Workflow>>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.list_workflows()).await.map(Json)
}

pub async fn create(State(state): State<AppState>,
                    JsonBody(body): JsonBody<NewWorkflow>)
                    -> ApiResult<(StatusCode, Json<WorkflowDetail>)> {
    let engine = state.engine.clone();
    let detail = run_blocking(move || engine.create_workflow(body)).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<WorkflowDetail>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.get_workflow(id)).await.map(Json)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let engine = state.engine.clone();
    run_blocking(move || engine.delete_workflow(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `null` si no hay workflow activo.
pub async fn active(State(state): State<AppState>) -> ApiResult<Json<Option<WorkflowDetail>>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.get_active()).await.map(Json)
}

pub async fn activate(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<WorkflowDetail>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.set_active(id)).await.map(Json)
}

pub async fn advance(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<WorkflowDetail>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.advance(id)).await.map(Json)
}

pub async fn submit_step(State(state): State<AppState>,
                         Path((id, step_id)): Path<(Uuid, Uuid)>,
                         JsonBody(transition): JsonBody<StepTransition>)
                         -> ApiResult<Json<WorkflowDetail>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.submit_step(id, step_id, transition)).await.map(Json)
}
