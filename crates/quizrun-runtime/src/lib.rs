//! Quizrun — local runtime.
//!
//! Owns one driver task per session key, delivers signals to them, and
//! resumes every session left running in the event store after a restart.

pub mod presentation;
pub mod runtime;

pub use presentation::TracingPresentationSink;
pub use runtime::LocalRuntime;
