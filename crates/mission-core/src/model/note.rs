use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EngineError;

/// Nota libre del dashboard (CRUD plano, sin reglas de progreso).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl NoteDraft {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.title.trim().is_empty() {
            return Err(EngineError::Validation("note title is required".into()));
        }
        Ok(())
    }

    pub fn into_note(self, now: DateTime<Utc>) -> Note {
        Note { id: Uuid::new_v4(),
               title: self.title,
               content: self.content,
               created_at: now,
               updated_at: now }
    }

    /// Aplica el borrador sobre una nota existente conservando `created_at`.
    pub fn apply_to(self, note: &Note, now: DateTime<Utc>) -> Note {
        Note { id: note.id,
               title: self.title,
               content: self.content,
               created_at: note.created_at,
               updated_at: now }
    }
}
