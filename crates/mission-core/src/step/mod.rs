//! Steps: estados y reglas de transición.
//!
//! La misma máquina sirve para steps de un workflow simple (secuencia por
//! `step_number`) y para steps plantilla resueltos dentro de una sesión de
//! composite (secuencia por `order_index`).

mod status;
pub mod transition;

pub use status::StepStatus;
pub use transition::{apply_transition, StepGate, StepState, StepTransition};
