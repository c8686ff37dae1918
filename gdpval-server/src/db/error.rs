//! Store error taxonomy
//!
//! Every failure of the task store lands in exactly one variant, and each
//! variant has a stable `kind()` code so callers never match on text.
//! Nothing here retries.

use crate::models::ValidationError;

/// Error returned by every `TaskStore` operation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task '{task_id}' already exists")]
    DuplicateTaskId { task_id: String },

    #[error("task '{task_id}' not found")]
    NotFound { task_id: String },

    #[error("referential integrity violated: {constraint}")]
    ReferentialViolation { constraint: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("transaction aborted: {0}")]
    TransactionAborted(#[source] sqlx::Error),

    #[error("unrecognized filter '{key}'")]
    InvalidFilter { key: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl StoreError {
    /// Stable machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateTaskId { .. } => "duplicate_task_id",
            Self::NotFound { .. } => "not_found",
            Self::ReferentialViolation { .. } => "referential_violation",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::TransactionAborted(_) => "transaction_aborted",
            Self::InvalidFilter { .. } => "invalid_filter",
            Self::Validation(_) => "validation_error",
        }
    }

    /// Classify a failure raised while writing `task_id`.
    ///
    /// Every unique constraint in the schema is keyed on task_id, so any
    /// unique violation during the fan-out means the task already exists.
    pub fn from_write(err: sqlx::Error, task_id: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::DuplicateTaskId {
                    task_id: task_id.to_owned(),
                };
            }
        }
        Self::from(err)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_foreign_key_violation() {
                return Self::ReferentialViolation {
                    constraint: db.constraint().unwrap_or("unknown").to_owned(),
                };
            }
        }
        if is_connection_failure(&err) {
            Self::StoreUnavailable(err)
        } else {
            Self::TransactionAborted(err)
        }
    }
}

/// Failures that mean "no usable connection", as opposed to a statement
/// the database refused.
fn is_connection_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_)
    )
}
