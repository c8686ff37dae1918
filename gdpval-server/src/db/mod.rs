//! Database layer - connection pool, task store and query building
//!
//! # Design Principles
//!
//! - One bounded pool, injected; no global handle
//! - Rely on DB constraints, handle conflicts - no check-then-insert
//! - One transaction per task write; drop without commit rolls back
//! - Filter values are always bound parameters

pub mod error;
pub mod filters;
pub mod memory;
pub mod pool;
pub mod repos;
pub mod store;

pub use error::StoreError;
pub use filters::{FilterField, ListQuery, TaskFilter, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
pub use memory::MemoryTaskStore;
pub use pool::{close_pool, create_pool, PoolError, PoolSettings};
pub use repos::PgTaskStore;
pub use store::TaskStore;
