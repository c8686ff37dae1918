//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Handles conflicts via constraints (no check-then-insert)
//! - Uses transactions for multi-step operations

pub mod tasks;

pub use tasks::PgTaskStore;
