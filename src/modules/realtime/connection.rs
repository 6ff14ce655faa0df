use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use super::Broadcaster;

/// Server-generated identifier of one open stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One framed message: SSE event name plus its JSON data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: &'static str,
    pub data: Arc<str>,
}

pub type FrameSender = mpsc::Sender<SseFrame>;

/// Removes its connection from the registry when dropped
pub struct ConnectionGuard {
    id: ConnectionId,
    broadcaster: Arc<Broadcaster>,
}

impl ConnectionGuard {
    pub fn new(id: ConnectionId, broadcaster: Arc<Broadcaster>) -> Self {
        Self { id, broadcaster }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        tracing::debug!(connection_id = %self.id, "SSE connection closed, unregistering");
        self.broadcaster.unregister(&self.id);
    }
}

/// Frames for one registered connection.
///
/// Ends when the broadcaster drops the sender (lagging or closed handle).
/// Dropping the subscription unregisters the connection.
pub struct Subscription {
    frames: ReceiverStream<SseFrame>,
    guard: ConnectionGuard,
}

impl Subscription {
    pub(super) fn new(receiver: mpsc::Receiver<SseFrame>, guard: ConnectionGuard) -> Self {
        Self {
            frames: ReceiverStream::new(receiver),
            guard,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.guard.id()
    }
}

impl Stream for Subscription {
    type Item = SseFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.frames).poll_next(cx)
    }
}
