//! Quizrun event store — `EventRepository` implementations.
//!
//! [`in_memory_event_repository`] keeps streams in process memory and is used
//! by tests and single-process deployments. [`pg_event_repository`] persists
//! them in `PostgreSQL` so sessions survive a restart of the owning process.

pub mod in_memory_event_repository;
pub mod pg_event_repository;
pub mod schema;
