//! Server bootstrap
//!
//! Binds the listener, prepares the storage root, and wires the file store
//! and change broadcaster into shared state for the router.

use std::io;
use std::sync::Arc;

use log::{error, info};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::events::ChangeBroadcaster;
use crate::server::routes;
use crate::server::state::AppState;
use crate::storage::{FileStore, FolderDepthPolicy, PathResolver};

pub struct Server {
    listener: TcpListener,
    state: AppState,
}

impl Server {
    pub async fn new(config: ServerConfig) -> io::Result<Self> {
        let resolver = PathResolver::new(&config.storage_root_path()).map_err(|e| {
            error!(
                "failed to prepare storage root {:?}: {}",
                config.storage_root, e
            );
            e
        })?;
        info!("storage root: {}", resolver.root().display());

        let events = Arc::new(ChangeBroadcaster::new(config.event_queue_capacity));
        let store = Arc::new(FileStore::new(
            resolver,
            FolderDepthPolicy::new(config.max_folder_depth),
            Arc::clone(&events),
            config.max_upload_bytes(),
        ));

        let addr = config.socket_addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("server bound to {}", addr);
                listener
            }
            Err(e) => {
                error!("failed to bind to {}: {}", addr, e);
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            state: AppState { store, events },
        })
    }

    pub async fn start(self) -> io::Result<()> {
        info!(
            "sharing {} on http://{}",
            self.state.store.root().display(),
            self.listener.local_addr()?
        );
        axum::serve(self.listener, routes::router(self.state)).await
    }
}
