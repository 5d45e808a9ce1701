//! lanshare - Entry Point
//!
//! A local-network file share server: one directory tree over HTTP with
//! live change notifications.

use log::{error, info};

use lanshare::config::ServerConfig;
use lanshare::Server;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("launching lanshare on {}", config.socket_addr());

    let server = match Server::new(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("server startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!("server error: {}", e);
        std::process::exit(1);
    }
}
