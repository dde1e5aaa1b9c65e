//! Motor de progresión de misiones.
//!
//! `MissionEngine` orquesta las operaciones: carga filas del store, planifica
//! el cambio con funciones puras (`progression`, `composite`) y lo persiste
//! con una sola escritura atómica. Si la validación falla no se escribe nada.

pub mod active;
pub mod composite;
pub mod progression;

use chrono::{DateTime, Utc};

use crate::repo::{InMemoryMissionStore, MissionStore};

pub use composite::{order_items, resolve_effective};
pub use progression::{derive_status, plan_advance, plan_step_submission};

/// Motor de misiones sobre un `MissionStore` arbitrario.
pub struct MissionEngine<S>
    where S: MissionStore
{
    store: S,
}

impl<S> MissionEngine<S> where S: MissionStore
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Acceso directo al store (tests, sondas de salud).
    pub fn store(&self) -> &S {
        &self.store
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl Default for MissionEngine<InMemoryMissionStore> {
    fn default() -> Self {
        Self::new(InMemoryMissionStore::new())
    }
}
