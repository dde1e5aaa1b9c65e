//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL` y parámetros opcionales de pool.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    /// Lee `DATABASE_URL` (obligatoria), `DATABASE_MIN_CONNECTIONS` (2) y
    /// `DATABASE_MAX_CONNECTIONS` (16).
    pub fn from_env() -> Result<Self, PersistenceError> {
        init_dotenv();
        let url = env::var("DATABASE_URL").map_err(|_| PersistenceError::Config("DATABASE_URL no definido".into()))?;
        Ok(Self::with_url(url))
    }

    /// Igual que `from_env` pero devuelve `None` si no hay `DATABASE_URL`.
    pub fn from_env_optional() -> Option<Self> {
        init_dotenv();
        env::var("DATABASE_URL").ok()
                                .filter(|url| !url.trim().is_empty())
                                .map(Self::with_url)
    }

    fn with_url(url: String) -> Self {
        let min_connections = env_u32("DATABASE_MIN_CONNECTIONS").unwrap_or(2);
        let max_connections = env_u32("DATABASE_MAX_CONNECTIONS").unwrap_or(16);
        Self { url,
               min_connections,
               max_connections }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
