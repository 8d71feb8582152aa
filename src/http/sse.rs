//! Server-Sent-Events fan-out
//!
//! `SseHub` owns the set of connected listeners. Every mutation and every broadcast
//! pass happens under one mutex; sends never block, so a slow or vanished client
//! is dropped instead of stalling the others.

use std::{
    collections::HashMap,
    convert::Infallible,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll},
};

use axum::response::sse::Event;
use futures::Stream;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Events buffered per client before it is considered stalled.
pub const CLIENT_BUFFER: usize = 32;

pub const CONNECTED_EVENT: &str = "connected";
pub const RESPONSE_EVENT: &str = "response";

#[derive(Clone, Default)]
pub struct SseHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    /// Set by `close_all`; written and read under the `clients` lock.
    closed: AtomicBool,
    clients: Mutex<HashMap<u64, mpsc::Sender<Event>>>,
}

impl SseHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<u64, mpsc::Sender<Event>>> {
        self.inner
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a listener and queues its `connected` greeting.
    ///
    /// Once the hub is closed the returned stream ends immediately.
    pub fn subscribe(&self) -> SseSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(CLIENT_BUFFER);
        let subscription = SseSubscription {
            id,
            hub: self.clone(),
            receiver,
        };

        let mut clients = self.clients();
        if self.inner.closed.load(Ordering::Acquire) {
            debug!(client_id = id, "sse hub closed, ending new stream");
            return subscription;
        }

        let greeting = encode_event(CONNECTED_EVENT, &json!({ "message": "MCP Server connected" }));
        if let Some(event) = greeting {
            let _ = sender.try_send(event);
        }
        clients.insert(id, sender);
        debug!(client_id = id, clients = clients.len(), "sse client connected");

        subscription
    }

    pub fn unsubscribe(&self, id: u64) {
        let removed = self.clients().remove(&id).is_some();
        if removed {
            debug!(client_id = id, "sse client disconnected");
        }
    }

    /// Pushes one event to every listener and returns how many accepted it.
    /// Listeners whose channel is closed or full are dropped.
    pub fn broadcast<T: Serialize>(&self, event: &str, payload: &T) -> usize {
        let Some(event) = encode_event(event, payload) else {
            return 0;
        };

        let mut clients = self.clients();
        clients.retain(|id, sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(err) => {
                warn!(client_id = *id, error = %err, "dropping sse client after failed push");
                false
            }
        });
        clients.len()
    }

    pub fn client_count(&self) -> usize {
        self.clients().len()
    }

    /// Drops every listener, ending their streams, and refuses later ones.
    pub fn close_all(&self) {
        let mut clients = self.clients();
        self.inner.closed.store(true, Ordering::Release);
        let closed = clients.len();
        clients.clear();
        debug!(clients = closed, "closed all sse clients");
    }
}

fn encode_event<T: Serialize>(event: &str, payload: &T) -> Option<Event> {
    match serde_json::to_string(payload) {
        Ok(data) => Some(Event::default().event(event).data(data)),
        Err(err) => {
            warn!(event, error = %err, "failed to encode sse payload");
            None
        }
    }
}

/// One listener's event stream. Dropping it deregisters the listener.
pub struct SseSubscription {
    id: u64,
    hub: SseHub,
    receiver: mpsc::Receiver<Event>,
}

impl SseSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Stream for SseSubscription {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx).map(|event| event.map(Ok))
    }
}

impl Drop for SseSubscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
