//! CRUD de notas. Sin reglas de negocio más allá del título obligatorio.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use mission_core::{EngineError, Note, NoteDraft};
use uuid::Uuid;

use super::extract::{JsonBody, Path};
use super::{run_blocking, AppState};
use crate::errors::api_error::ApiResult;

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Note>>> {
    let notes = state.notes.clone();
    run_blocking(move || Ok(notes.list_notes()?)).await.map(Json)
}

pub async fn create(State(state): State<AppState>, JsonBody(draft): JsonBody<NoteDraft>) -> ApiResult<(StatusCode, Json<Note>)> {
    let notes = state.notes.clone();
    let note = run_blocking(move || {
                   draft.validate()?;
                   let note = draft.into_note(Utc::now());
                   notes.insert_note(&note)?;
                   Ok(note)
               }).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Note>> {
    let notes = state.notes.clone();
    run_blocking(move || notes.get_note(id)?.ok_or_else(|| EngineError::not_found("note", id))).await
                                                                                                .map(Json)
}

pub async fn update(State(state): State<AppState>,
                    Path(id): Path<Uuid>,
                    JsonBody(draft): JsonBody<NoteDraft>)
                    -> ApiResult<Json<Note>> {
    let notes = state.notes.clone();
    run_blocking(move || {
        draft.validate()?;
        let current = notes.get_note(id)?.ok_or_else(|| EngineError::not_found("note", id))?;
        let updated = draft.apply_to(&current, Utc::now());
        if !notes.update_note(&updated)? {
            return Err(EngineError::not_found("note", id));
        }
        Ok(updated)
    }).await
      .map(Json)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let notes = state.notes.clone();
    run_blocking(move || {
        if notes.delete_note(id)? {
            Ok(())
        } else {
            Err(EngineError::not_found("note", id))
        }
    }).await?;
    Ok(StatusCode::NO_CONTENT)
}
