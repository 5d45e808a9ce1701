//! Error handling
//!
//! Defines error types and handling for the file share server.

pub mod types;

pub use types::*;
