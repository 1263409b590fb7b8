//! Application layer for the quiz context.

pub mod control;
pub mod inbox;
pub mod journal;
pub mod ports;
pub mod query_handlers;
pub mod round_resolver;
pub mod session_driver;
pub mod settings;
