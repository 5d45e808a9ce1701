pub mod config;
pub mod error;
pub mod events;
pub mod server;
pub mod storage;

pub use server::Server;
