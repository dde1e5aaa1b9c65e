pub mod memory;
pub mod types;

pub use memory::InMemoryMissionStore;
pub use types::{MissionStore, NoteStore, StoreError, WorkflowCommit};
