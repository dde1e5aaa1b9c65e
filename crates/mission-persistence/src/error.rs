//! Errores de persistencia.
//! Mapea errores de Diesel / conexión a variantes semánticas y, de ahí, a
//! `StoreError` del core.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use mission_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("version conflict: {0}")]
    VersionConflict(String),
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                other => Self::Unknown(format!("db error kind {:?}: {}", other, info.message())),
            },
            DieselError::DeserializationError(e) => Self::Corrupt(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            DieselError::QueryBuilderError(e) => Self::Unknown(format!("query builder: {e}")),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound => StoreError::NotFound("row".into()),
            PersistenceError::ForeignKeyViolation(msg) => StoreError::NotFound(msg),
            PersistenceError::UniqueViolation(msg) | PersistenceError::VersionConflict(msg) => StoreError::Conflict(msg),
            PersistenceError::SerializationConflict => StoreError::Conflict("serialization failure".into()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_and_missing_rows_keep_their_meaning() {
        assert!(matches!(StoreError::from(PersistenceError::VersionConflict("v".into())), StoreError::Conflict(_)));
        assert!(matches!(StoreError::from(PersistenceError::SerializationConflict), StoreError::Conflict(_)));
        assert!(matches!(StoreError::from(PersistenceError::ForeignKeyViolation("fk".into())), StoreError::NotFound(_)));
        assert!(matches!(StoreError::from(PersistenceError::TransientIo("down".into())), StoreError::Backend(_)));
    }

    #[test]
    fn diesel_not_found_maps_directly() {
        assert!(matches!(PersistenceError::from(DieselError::NotFound), PersistenceError::NotFound));
    }
}
