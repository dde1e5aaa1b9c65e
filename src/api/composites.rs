use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use mission_core::{CompositeDetail, CompositeWorkflow, NewComposite, NewSession, SessionView};
use uuid::Uuid;

use super::extract::{JsonBody, Path};
use super::{run_blocking, AppState};
use crate::errors::api_error::ApiResult;

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<CompositeWorkflow>>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.list_composites()).await.map(Json)
}

pub async fn create(State(state): State<AppState>,
                    JsonBody(body): JsonBody<NewComposite>)
                    -> ApiResult<(StatusCode, Json<CompositeDetail>)> {
    let engine = state.engine.clone();
    let detail = run_blocking(move || engine.create_composite(body)).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<CompositeDetail>> {
    let engine = state.engine.clone();
    run_blocking(move || engine.get_composite(id)).await.map(Json)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let engine = state.engine.clone();
    run_blocking(move || engine.delete_composite(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// El cuerpo es opcional: sin él la sesión queda anónima.
pub async fn create_session(State(state): State<AppState>,
                            Path(id): Path<Uuid>,
                            body: Option<JsonBody<NewSession>>)
                            -> ApiResult<(StatusCode, Json<SessionView>)> {
    let engine = state.engine.clone();
    let new = body.map(|JsonBody(b)| b).unwrap_or_default();
    let view = run_blocking(move || engine.create_session(id, new)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
