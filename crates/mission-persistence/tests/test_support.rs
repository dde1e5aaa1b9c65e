use mission_core::MissionEngine;
use mission_persistence::config::DbConfig;
use mission_persistence::pg::{build_pool, PgMissionStore, PgPool, PoolProvider};
use once_cell::sync::Lazy;

pub static TEST_POOL: Lazy<Option<PgPool>> = Lazy::new(|| {
    let cfg = DbConfig::from_env_optional()?;
    match build_pool(&cfg.url, 1, 4) {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("No se pudo construir pool de test: {e}");
            None
        }
    }
});

pub type PgEngine = MissionEngine<PgMissionStore<PoolProvider>>;

/// Ejecuta `f` con un engine sobre Postgres; `None` (test omitido) si no hay
/// `DATABASE_URL`.
pub fn with_engine<F, R>(f: F) -> Option<R>
    where F: FnOnce(&PgEngine) -> R
{
    match TEST_POOL.as_ref() {
        Some(pool) => {
            let engine = MissionEngine::new(PgMissionStore::new(PoolProvider { pool: pool.clone() }));
            Some(f(&engine))
        }
        None => {
            eprintln!("DATABASE_URL no definido: omitiendo test");
            None
        }
    }
}
