//! Implementación Postgres (Diesel) de `MissionStore` y `NoteStore`.
//!
//! - Cada método de escritura corre en una única transacción
//!   (`build_transaction().read_write()`); si algo falla se revierte todo.
//! - Las escrituras con token de versión usan `UPDATE ... WHERE version = $n`;
//!   cero filas afectadas => `PersistenceError::VersionConflict`.
//! - Sólo las lecturas se reintentan ante errores transitorios. Una escritura
//!   que falla vuelve al caller tal cual.

mod rows;
mod store;

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

pub use store::PgMissionStore;

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real o uno de test sin acoplar el store a r2d2.
/// Debe devolver una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
#[derive(Clone)]
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

// Mensajes de pérdida de conexión que Diesel no clasifica.
const DROPPED_CONNECTION: &[&str] = &["connection closed", "connection refused", "terminating connection"];

/// Una lectura sólo falla de forma recuperable si el pool no entrega
/// conexión o si el servidor la corta a mitad de consulta.
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::TransientIo(_) | PersistenceError::SerializationConflict => true,
        PersistenceError::Unknown(msg) => {
            let msg = msg.to_lowercase();
            DROPPED_CONNECTION.iter().any(|m| msg.contains(m))
        }
        _ => false,
    }
}

const READ_RETRIES: u64 = 3;

/// Repite una lectura hasta `READ_RETRIES` veces, esperando 15ms más en
/// cada vuelta. Las escrituras no pasan por aquí.
fn with_retry<F, T>(mut read: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut retries = 0;
    loop {
        match read() {
            Err(e) if retries < READ_RETRIES && is_retryable(&e) => {
                retries += 1;
                let wait = std::time::Duration::from_millis(15 * retries);
                warn!("read failed ({e}), retry {retries}/{READ_RETRIES} in {wait:?}");
                std::thread::sleep(wait);
            }
            outcome => return outcome,
        }
    }
}

/// Construye el pool y corre las migraciones pendientes una sola vez.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    debug!("pool ready min={final_min} max={validated_max}");
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn transient_errors_are_retried_then_surface() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::TransientIo("down".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn business_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::VersionConflict("v".into()))
        });
        assert!(matches!(result, Err(PersistenceError::VersionConflict(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn dropped_connection_is_retried_until_it_recovers() {
        let calls = Cell::new(0);
        let result = with_retry(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(PersistenceError::Unknown("server closed: Connection closed unexpectedly".into()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
        assert!(!is_retryable(&PersistenceError::Unknown("syntax error".into())));
    }
}
