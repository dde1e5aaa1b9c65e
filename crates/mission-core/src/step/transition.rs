//! Máquina de estados de un step individual.
//!
//! `apply_transition` es pura: recibe el estado actual (de la plantilla o el
//! efectivo de una sesión), la compuerta y la transición pedida, y devuelve
//! el nuevo estado o `InvalidTransition`. Nunca escribe; si falla, el
//! estado almacenado queda intacto.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::model::{Proof, ProofSubmission};

use super::StepStatus;

/// Estado mutable de un step (lo que cambia con cada transición).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepState {
    pub status: StepStatus,
    pub proof: Proof,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StepState {
    pub fn locked() -> Self {
        Self { status: StepStatus::Locked,
               proof: Proof::default(),
               completed_at: None }
    }

    pub fn active() -> Self {
        Self { status: StepStatus::Active,
               ..Self::locked() }
    }
}

/// Contexto que decide si una transición es legal.
///
/// `predecessor` es el estado del step inmediatamente anterior en su
/// secuencia (`None` si es el primero o, en workflows simples, si no existe
/// fila para la posición anterior).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepGate {
    pub predecessor: Option<StepStatus>,
    pub requires_approval: bool,
    pub proof_required: bool,
}

impl StepGate {
    /// Completar exige prueba sólo si el step requiere aprobación Y prueba.
    pub fn needs_proof(&self) -> bool {
        self.requires_approval && self.proof_required
    }
}

/// Transición pedida por el cliente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTransition {
    pub status: StepStatus,
    #[serde(default)]
    pub proof: Option<ProofSubmission>,
}

impl StepTransition {
    pub fn to(status: StepStatus) -> Self {
        Self { status, proof: None }
    }

    pub fn activate() -> Self {
        Self::to(StepStatus::Active)
    }

    pub fn complete() -> Self {
        Self::to(StepStatus::Completed)
    }

    pub fn with_proof(mut self, proof: ProofSubmission) -> Self {
        self.proof = Some(proof);
        self
    }
}

pub fn apply_transition(current: &StepState,
                        gate: &StepGate,
                        transition: &StepTransition,
                        now: DateTime<Utc>)
                        -> Result<StepState, EngineError> {
    let from = current.status;
    let to = transition.status;
    let mut next = current.clone();

    match (from, to) {
        (StepStatus::Locked, StepStatus::Active) => {
            if let Some(prev) = gate.predecessor {
                if prev != StepStatus::Completed {
                    return Err(EngineError::invalid(from, to, format!("previous step is {prev}, not completed")));
                }
            }
            next.status = StepStatus::Active;
            if let Some(proof) = &transition.proof {
                next.proof.record(proof, now);
            }
        }
        (StepStatus::Active, StepStatus::Active) => {
            // Sub-estado de envío de prueba: sólo tiene sentido con payload.
            let proof = transition.proof
                                  .as_ref()
                                  .filter(|p| p.has_payload())
                                  .ok_or_else(|| EngineError::invalid(from, to, "step is already active and no proof was attached"))?;
            next.proof.record(proof, now);
        }
        (StepStatus::Active, StepStatus::Completed) => {
            if let Some(proof) = &transition.proof {
                next.proof.record(proof, now);
            }
            if gate.needs_proof() && !next.proof.is_attached() {
                return Err(EngineError::invalid(from, to, "proof must be submitted before completing this step"));
            }
            next.status = StepStatus::Completed;
            next.completed_at = Some(now);
        }
        (StepStatus::Completed, _) => {
            return Err(EngineError::invalid(from, to, "step is already completed"));
        }
        (_, StepStatus::Locked) => {
            return Err(EngineError::invalid(from, to, "steps never return to locked"));
        }
        (StepStatus::Locked, StepStatus::Completed) => {
            return Err(EngineError::invalid(from, to, "step must be active before it can be completed"));
        }
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_gate() -> StepGate {
        StepGate { predecessor: None,
                   requires_approval: false,
                   proof_required: false }
    }

    fn proof_gate() -> StepGate {
        StepGate { requires_approval: true,
                   proof_required: true,
                   ..open_gate() }
    }

    #[test]
    fn locked_step_activates_only_after_predecessor_completes() {
        let now = Utc::now();
        let gate = StepGate { predecessor: Some(StepStatus::Active),
                              ..open_gate() };
        let err = apply_transition(&StepState::locked(), &gate, &StepTransition::activate(), now).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));

        let gate = StepGate { predecessor: Some(StepStatus::Completed),
                              ..open_gate() };
        let next = apply_transition(&StepState::locked(), &gate, &StepTransition::activate(), now).unwrap();
        assert_eq!(next.status, StepStatus::Active);
    }

    #[test]
    fn completing_sets_timestamp() {
        let now = Utc::now();
        let next = apply_transition(&StepState::active(), &open_gate(), &StepTransition::complete(), now).unwrap();
        assert_eq!(next.status, StepStatus::Completed);
        assert_eq!(next.completed_at, Some(now));
    }

    #[test]
    fn locked_cannot_jump_to_completed() {
        let err = apply_transition(&StepState::locked(), &open_gate(), &StepTransition::complete(), Utc::now()).unwrap_err();
        assert!(matches!(err,
                         EngineError::InvalidTransition { from: StepStatus::Locked,
                                                          to: StepStatus::Completed,
                                                          .. }));
    }

    #[test]
    fn completed_is_terminal() {
        let done = StepState { status: StepStatus::Completed,
                               completed_at: Some(Utc::now()),
                               ..StepState::locked() };
        for t in [StepTransition::activate(), StepTransition::complete(), StepTransition::to(StepStatus::Locked)] {
            assert!(apply_transition(&done, &open_gate(), &t, Utc::now()).is_err());
        }
    }

    #[test]
    fn proof_gate_blocks_until_proof_is_attached() {
        let now = Utc::now();
        let err = apply_transition(&StepState::active(), &proof_gate(), &StepTransition::complete(), now).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));

        // Enviar la prueba primero (sub-estado) y luego completar.
        let with_proof = apply_transition(&StepState::active(),
                                          &proof_gate(),
                                          &StepTransition::activate().with_proof(ProofSubmission::content("signed contract")),
                                          now).unwrap();
        assert_eq!(with_proof.status, StepStatus::Active);
        assert!(with_proof.proof.is_attached());
        let done = apply_transition(&with_proof, &proof_gate(), &StepTransition::complete(), now).unwrap();
        assert_eq!(done.status, StepStatus::Completed);
        assert_eq!(done.completed_at, Some(now));
    }

    #[test]
    fn proof_can_travel_with_the_completion() {
        let t = StepTransition::complete().with_proof(ProofSubmission::content("photo of the finished wall"));
        let done = apply_transition(&StepState::active(), &proof_gate(), &t, Utc::now()).unwrap();
        assert_eq!(done.status, StepStatus::Completed);
        assert_eq!(done.proof.content.as_deref(), Some("photo of the finished wall"));
    }

    #[test]
    fn gate_only_applies_when_both_flags_are_set() {
        let approval_only = StepGate { requires_approval: true,
                                       ..open_gate() };
        assert!(apply_transition(&StepState::active(), &approval_only, &StepTransition::complete(), Utc::now()).is_ok());
        let proof_only = StepGate { proof_required: true,
                                    ..open_gate() };
        assert!(apply_transition(&StepState::active(), &proof_only, &StepTransition::complete(), Utc::now()).is_ok());
    }

    #[test]
    fn active_to_active_requires_payload() {
        let err = apply_transition(&StepState::active(), &open_gate(), &StepTransition::activate(), Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }
}
