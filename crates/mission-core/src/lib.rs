//! mission-core: motor síncrono de progresión de misiones.
//!
//! - `step`: estados de un step y su máquina de transiciones.
//! - `model`: tipos de dominio serializables (camelCase).
//! - `repo`: contratos de almacenamiento y backend en memoria.
//! - `engine`: operaciones de alto nivel (workflows, composites, sesiones,
//!   workflow activo).

pub mod engine;
pub mod errors;
pub mod model;
pub mod repo;
pub mod step;

pub use engine::MissionEngine;
pub use errors::EngineError;
pub use model::{CompositeDetail, CompositeWorkflow, CompositeWorkflowItem, CompositeWorkflowSession, NewComposite,
                NewCompositeItem, NewSession, NewStep, NewWorkflow, Note, NoteDraft, Priority, Proof, ProofFile,
                ProofSubmission, SessionStep, SessionStepView, SessionView, Step, Workflow, WorkflowDetail,
                WorkflowStatus};
pub use repo::{InMemoryMissionStore, MissionStore, NoteStore, StoreError, WorkflowCommit};
pub use step::{StepStatus, StepTransition};
