//! Shared test mocks and utilities for Quizrun.

mod clock;
mod presentation;
mod questions;
mod repository;

pub use clock::FixedClock;
pub use presentation::{
    FailingPresentationSink, Publication, RecordingPresentationSink, SlowSummarySink,
};
pub use questions::{blank_question, capital_question, question};
pub use repository::{
    EmptyEventRepository, FailingEventRepository, RecordingEventRepository, SlowLoadEventRepository,
};
