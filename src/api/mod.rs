//! Router HTTP.
//!
//! El engine es síncrono: cada handler lo invoca dentro de
//! `spawn_blocking` para no bloquear el runtime de tokio.

mod composites;
mod extract;
mod health;
mod notes;
mod sessions;
mod workflows;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use mission_core::{EngineError, InMemoryMissionStore, MissionEngine, MissionStore, NoteStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::ApiError;

pub type SharedEngine = MissionEngine<Arc<dyn MissionStore>>;

/// Estado compartido por todos los handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SharedEngine>,
    pub notes: Arc<dyn NoteStore>,
}

impl AppState {
    pub fn new(missions: Arc<dyn MissionStore>, notes: Arc<dyn NoteStore>) -> Self {
        Self { engine: Arc::new(MissionEngine::new(missions)),
               notes }
    }

    /// Ambos contratos servidos por el mismo store.
    pub fn from_store<S>(store: Arc<S>) -> Self
        where S: MissionStore + NoteStore + 'static
    {
        Self::new(store.clone(), store)
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryMissionStore::new()))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new().route("/ping", get(health::ping))
                 .route("/workflows", get(workflows::list).post(workflows::create))
                 .route("/workflows/active", get(workflows::active))
                 .route("/workflows/:id", get(workflows::get).delete(workflows::delete))
                 .route("/workflows/:id/activate", post(workflows::activate))
                 .route("/workflows/:id/advance", post(workflows::advance))
                 .route("/workflows/:id/steps/:step_id/submit", post(workflows::submit_step))
                 .route("/composites", get(composites::list).post(composites::create))
                 .route("/composites/:id", get(composites::get).delete(composites::delete))
                 .route("/composites/:id/sessions", post(composites::create_session))
                 .route("/composite-sessions", get(sessions::list))
                 .route("/composite-sessions/:id", get(sessions::get).delete(sessions::delete))
                 .route("/composite-sessions/:id/steps/:step_id/submit", post(sessions::submit_step))
                 .route("/notes", get(notes::list).post(notes::create))
                 .route("/notes/:id", get(notes::get).put(notes::update).delete(notes::delete))
                 .layer(TraceLayer::new_for_http())
                 .layer(CorsLayer::permissive())
                 .with_state(state)
}

/// Ejecuta trabajo síncrono (engine / store) fuera del runtime async.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
    where F: FnOnce() -> Result<T, EngineError> + Send + 'static,
          T: Send + 'static
{
    tokio::task::spawn_blocking(f).await
                                  .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
                                  .map_err(ApiError::from)
}
