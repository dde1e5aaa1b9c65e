//! MissionFlow
//!
//! Servicio HTTP sobre `mission-core`:
//! - `api`: router axum y handlers (workflows, composites, sesiones, notas).
//! - `config`: configuración desde entorno y selección de store.
//! - `errors`: errores de arranque (`CoreError`) y de API (`ApiError`).

pub mod api;
pub mod config;
pub mod errors;

pub use api::{build_router, AppState};
pub use config::AppConfig;
pub use errors::{ApiError, CoreError};
