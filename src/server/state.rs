use std::sync::Arc;

use crate::events::ChangeBroadcaster;
use crate::storage::FileStore;

/// Shared handles every request handler works against.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FileStore>,
    pub events: Arc<ChangeBroadcaster>,
}
