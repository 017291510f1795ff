//! Execution engine and checkpoint persistence.
//!
//! The runtime layer has three pieces:
//!
//! - [`checkpointer`]: the [`Checkpointer`] trait, the [`Checkpoint`] type,
//!   and the in-memory implementation
//! - [`resilience`]: bounded retry with reconnect for flaky backends
//! - [`runner`]: the engine that drives a graph over checkpointed state
//!
//! The PostgreSQL backend lives behind the `postgres` feature.

pub mod checkpointer;
pub mod persistence;
pub mod resilience;
pub mod runner;

#[cfg(feature = "postgres")]
pub mod checkpointer_postgres;

pub use checkpointer::{Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer};
pub use persistence::PersistedCheckpoint;
pub use resilience::{Reconnect, Resilient, RetryPolicy};
pub use runner::WorkflowRunner;

#[cfg(feature = "postgres")]
pub use checkpointer_postgres::PostgresCheckpointer;
