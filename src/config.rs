//! Configuración central de la aplicación.
//!
//! Carga variables de entorno (.env vía `mission_persistence::init_dotenv`) y
//! decide el backend: Postgres si hay `DATABASE_URL`, memoria si no.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use mission_core::InMemoryMissionStore;
use mission_persistence::{build_pool, init_dotenv, DbConfig, PgMissionStore, PoolProvider};
use tracing::{info, warn};

use crate::api::AppState;
use crate::errors::CoreError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Dirección de escucha (`MISSIONFLOW_BIND_ADDR`).
    pub bind_addr: SocketAddr,
    /// `None` => store en memoria (no persiste entre reinicios).
    pub database: Option<DbConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        init_dotenv();
        let raw = env::var("MISSIONFLOW_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
        let bind_addr = raw.parse()
                           .map_err(|e| CoreError::Config(format!("MISSIONFLOW_BIND_ADDR '{raw}': {e}")))?;
        Ok(Self { bind_addr,
                  database: DbConfig::from_env_optional() })
    }

    /// Construye los stores y el estado compartido de los handlers. Con
    /// Postgres corre las migraciones pendientes antes de devolver.
    pub fn build_state(&self) -> Result<AppState, CoreError> {
        match &self.database {
            Some(db) => {
                let pool = build_pool(&db.url, db.min_connections, db.max_connections)?;
                info!(min = db.min_connections, max = db.max_connections, "postgres pool ready");
                let store = Arc::new(PgMissionStore::new(PoolProvider { pool }));
                Ok(AppState::from_store(store))
            }
            None => {
                warn!("DATABASE_URL not set: using in-memory store, data will not survive restarts");
                let store = Arc::new(InMemoryMissionStore::new());
                Ok(AppState::from_store(store))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_core::NoteStore;

    #[test]
    fn in_memory_state_without_database() {
        let config = AppConfig { bind_addr: DEFAULT_BIND_ADDR.parse().unwrap(),
                                 database: None };
        let state = config.build_state().unwrap();
        assert!(state.engine.list_workflows().unwrap().is_empty());
        assert!(state.notes.list_notes().unwrap().is_empty());
    }
}
