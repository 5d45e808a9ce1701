//! Notification channel
//!
//! One long-lived SSE connection per client. Each connection subscribes to
//! the change broadcaster, sends the `connected` acknowledgement first, and
//! then forwards every event in arrival order until the client disconnects.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;
use log::info;

use crate::events::{ChangeBroadcaster, ChangeEvent, SubscriberId};
use crate::server::state::AppState;

pub async fn notification_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, mut rx) = state.events.subscribe().await;
    info!("notification client {} connected", id);

    let events = Arc::clone(&state.events);
    let stream = async_stream::stream! {
        let _guard = Unsubscribe { id, events };

        if let Ok(json) = serde_json::to_string(&ChangeEvent::Connected) {
            yield Ok(Event::default().data(json));
        }
        while let Some(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                yield Ok(Event::default().data(json));
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Removes the subscription when the connection task is dropped.
///
/// The broadcaster would also prune the closed channel on its next publish;
/// this keeps the subscriber set tight without waiting for one.
struct Unsubscribe {
    id: SubscriberId,
    events: Arc<ChangeBroadcaster>,
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        let events = Arc::clone(&self.events);
        let id = self.id;
        info!("notification client {} disconnected", id);
        tokio::spawn(async move {
            events.unsubscribe(id).await;
        });
    }
}
