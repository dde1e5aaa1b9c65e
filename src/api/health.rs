use axum::extract::State;
use axum::Json;
use mission_core::MissionStore;
use serde_json::{json, Value};

use super::{run_blocking, AppState};

/// Liveness. Responde 200 aunque la base no conteste; el estado de la base
/// va en `database`.
pub async fn ping(State(state): State<AppState>) -> Json<Value> {
    let engine = state.engine.clone();
    let database = match run_blocking(move || engine.store().ping().map_err(Into::into)).await {
        Ok(()) => "connected",
        Err(err) => {
            tracing::warn!("ping: store unavailable: {err}");
            "error"
        }
    };
    Json(json!({ "status": "ok", "database": database }))
}
