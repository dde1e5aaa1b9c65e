//! Prueba de completitud adjunta a un step (plantilla o sesión).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadatos de un archivo subido como prueba. El contenido binario vive
/// fuera del motor; aquí sólo se guarda la referencia.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofFile {
    pub name: String,
    pub url: Option<String>,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub file: Option<ProofFile>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submitted_by: Option<String>,
}

impl Proof {
    /// Hay contenido o archivo (independiente de si ya se registró el envío).
    pub fn has_payload(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty()) || self.file.is_some()
    }

    /// Prueba adjunta y registrada: requisito de la compuerta de aprobación.
    pub fn is_attached(&self) -> bool {
        self.has_payload() && self.submitted_at.is_some()
    }

    /// Aplica un envío sobre la prueba actual. Los campos presentes
    /// sobrescriben; `submitted_at` se fija sólo si queda payload.
    pub fn record(&mut self, submission: &ProofSubmission, now: DateTime<Utc>) {
        if submission.title.is_some() {
            self.title = submission.title.clone();
        }
        if submission.description.is_some() {
            self.description = submission.description.clone();
        }
        if submission.content.is_some() {
            self.content = submission.content.clone();
        }
        if submission.file.is_some() {
            self.file = submission.file.clone();
        }
        if submission.submitted_by.is_some() {
            self.submitted_by = submission.submitted_by.clone();
        }
        if self.has_payload() {
            self.submitted_at = Some(now);
        }
    }
}

/// Payload de prueba enviado por el cliente junto con una transición.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofSubmission {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file: Option<ProofFile>,
    #[serde(default)]
    pub submitted_by: Option<String>,
}

impl ProofSubmission {
    pub fn content(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()),
               ..Self::default() }
    }

    pub fn has_payload(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty()) || self.file.is_some()
    }
}
