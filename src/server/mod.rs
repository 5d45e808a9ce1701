//! HTTP server
//!
//! Bootstrap, shared state, the route dispatcher, and the per-client
//! notification channel.

pub mod core;
pub mod events;
pub mod routes;
pub mod state;

pub use core::Server;
pub use state::AppState;
