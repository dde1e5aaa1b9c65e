//! Modelo de datos del motor: workflows, steps, composites, sesiones y
//! notas. Todos los tipos viajan como JSON camelCase.

pub mod composite;
pub mod note;
pub mod proof;
pub mod workflow;

pub use composite::{CompositeDetail, CompositeWorkflow, CompositeWorkflowItem, CompositeWorkflowSession, NewComposite,
                    NewCompositeItem, NewSession, SessionStep, SessionStepView, SessionView};
pub use note::{Note, NoteDraft};
pub use proof::{Proof, ProofFile, ProofSubmission};
pub use workflow::{NewStep, NewWorkflow, Priority, Step, Workflow, WorkflowDetail, WorkflowStatus};
