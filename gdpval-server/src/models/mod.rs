//! Domain models with validation
//!
//! Payloads arrive shape-checked by serde; `NewTask::validate` enforces
//! the value rules before anything reaches the store.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod task;

pub use validation::ValidationError;
pub use task::{
    Difficulty, FileCategory, FileMetadata, NewTask, RubricItem, StoredRubric, TaskDetail,
    TaskHeader, MAX_TASK_ID_LEN,
};
