use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Estado de un Step (plantilla de workflow o resuelto por sesión).
///
/// Las transiciones válidas son:
/// - `Locked` -> `Active`
/// - `Active` -> `Active` (sólo para adjuntar una prueba)
/// - `Active` -> `Completed`
///
/// No se permiten reversiones ni saltos: `Completed` es terminal y ningún
/// estado vuelve a `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Bloqueado hasta que el paso anterior se complete.
    Locked,
    /// Paso en curso (a lo sumo uno por secuencia).
    Active,
    /// Paso finalizado.
    Completed,
}

impl StepStatus {
    /// Tabla de transiciones. Cualquier par fuera de esta tabla es ilegal.
    pub fn can_transition_to(self, to: StepStatus) -> bool {
        matches!((self, to),
                 (StepStatus::Locked, StepStatus::Active)
                 | (StepStatus::Active, StepStatus::Active)
                 | (StepStatus::Active, StepStatus::Completed))
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed)
    }

    /// Representación estable usada en columnas de texto.
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Locked => "locked",
            StepStatus::Active => "active",
            StepStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(StepStatus::Locked),
            "active" => Ok(StepStatus::Active),
            "completed" => Ok(StepStatus::Completed),
            other => Err(format!("unknown step status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_is_linear() {
        use StepStatus::*;
        assert!(Locked.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Active));
        assert!(!Locked.can_transition_to(Completed));
        assert!(!Locked.can_transition_to(Locked));
        assert!(!Active.can_transition_to(Locked));
        for to in [Locked, Active, Completed] {
            assert!(!Completed.can_transition_to(to), "completed must be terminal");
        }
    }

    #[test]
    fn text_form_roundtrips_and_rejects_unknown() {
        for s in [StepStatus::Locked, StepStatus::Active, StepStatus::Completed] {
            assert_eq!(s.as_str().parse::<StepStatus>(), Ok(s));
        }
        assert!("done".parse::<StepStatus>().is_err());
        assert_eq!(serde_json::to_string(&StepStatus::Completed).unwrap(), "\"completed\"");
    }
}
