use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::connection::{ConnectionGuard, ConnectionId, FrameSender, SseFrame, Subscription};
use crate::shared::constants::EVENT_PING;

/// Registry of open SSE connections with fan-out publishing
pub struct Broadcaster {
    connections: DashMap<ConnectionId, FrameSender>,
    channel_capacity: usize,
}

impl Broadcaster {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Add a handle; every later publish is delivered to it
    pub fn register(&self, sender: FrameSender) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.connections.insert(connection_id, sender);
        tracing::info!(
            connection_id = %connection_id,
            connections = self.connections.len(),
            "Registered SSE connection"
        );
        connection_id
    }

    /// Remove a handle. Unknown or already removed ids are ignored.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        if self.connections.remove(connection_id).is_some() {
            tracing::info!(
                connection_id = %connection_id,
                connections = self.connections.len(),
                "Unregistered SSE connection"
            );
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Open a connection: queue the initial ping, then register.
    ///
    /// The ping is queued before registration so it is always the first frame.
    pub fn open(self: &Arc<Self>) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.channel_capacity);

        let ping = SseFrame {
            event: EVENT_PING,
            data: json!({ "time": chrono::Utc::now().timestamp_millis() })
                .to_string()
                .into(),
        };
        if sender.try_send(ping).is_err() {
            tracing::warn!("Failed to queue initial ping on a fresh SSE channel");
        }

        let connection_id = self.register(sender);
        Subscription::new(receiver, ConnectionGuard::new(connection_id, Arc::clone(self)))
    }

    /// Serialize `payload` once and send it as `event` to every registered handle.
    ///
    /// A handle whose channel is closed or full is removed; the others still
    /// receive the frame.
    pub fn publish<T: Serialize>(&self, event: &'static str, payload: &T) {
        let data: Arc<str> = match serde_json::to_string(payload) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!("Failed to serialize SSE payload for {}: {}", event, e);
                return;
            }
        };
        let frame = SseFrame { event, data };

        let mut failed = Vec::new();
        let mut delivered = 0usize;
        for entry in self.connections.iter() {
            match entry.value().try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        connection_id = %entry.key(),
                        "SSE subscriber is lagging, dropping connection"
                    );
                    failed.push(*entry.key());
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        connection_id = %entry.key(),
                        "SSE subscriber is gone, dropping connection"
                    );
                    failed.push(*entry.key());
                }
            }
        }

        // Shard locks are released once iteration ends
        for connection_id in &failed {
            self.unregister(connection_id);
        }

        tracing::debug!(
            event,
            delivered,
            dropped = failed.len(),
            "Published SSE event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::Value;

    fn frame_json(frame: &SseFrame) -> Value {
        serde_json::from_str(&frame.data).unwrap()
    }

    #[tokio::test]
    async fn test_publish_reaches_every_registered_handle() {
        let broadcaster = Broadcaster::new(8);
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        broadcaster.register(tx_a);
        broadcaster.register(tx_b);

        broadcaster.publish("locations:update", &json!({ "type": "create" }));

        for rx in [&mut rx_a, &mut rx_b] {
            let frame = rx.recv().await.unwrap();
            assert_eq!(frame.event, "locations:update");
            assert_eq!(frame_json(&frame), json!({ "type": "create" }));
        }
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let broadcaster = Broadcaster::new(8);
        let (tx, _rx) = mpsc::channel(8);
        let id = broadcaster.register(tx);

        broadcaster.unregister(&id);
        broadcaster.unregister(&id);
        broadcaster.unregister(&ConnectionId::new());

        assert_eq!(broadcaster.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_handle_is_removed_without_affecting_others() {
        let broadcaster = Broadcaster::new(8);
        let (tx_closed, rx_closed) = mpsc::channel(8);
        let (tx_open, mut rx_open) = mpsc::channel(8);
        broadcaster.register(tx_closed);
        broadcaster.register(tx_open);
        drop(rx_closed);

        broadcaster.publish("locations:update", &json!({ "n": 1 }));

        assert_eq!(broadcaster.connection_count(), 1);
        assert_eq!(frame_json(&rx_open.recv().await.unwrap()), json!({ "n": 1 }));

        // Never written to again
        broadcaster.publish("locations:update", &json!({ "n": 2 }));
        assert_eq!(frame_json(&rx_open.recv().await.unwrap()), json!({ "n": 2 }));
    }

    #[tokio::test]
    async fn test_lagging_handle_is_dropped() {
        let broadcaster = Broadcaster::new(8);
        let (tx_slow, mut rx_slow) = mpsc::channel(1);
        let (tx_fast, mut rx_fast) = mpsc::channel(8);
        broadcaster.register(tx_slow);
        broadcaster.register(tx_fast);

        broadcaster.publish("e", &1);
        broadcaster.publish("e", &2);

        assert_eq!(broadcaster.connection_count(), 1);
        assert_eq!(rx_fast.recv().await.unwrap().data.as_ref(), "1");
        assert_eq!(rx_fast.recv().await.unwrap().data.as_ref(), "2");

        // The slow subscriber keeps what it buffered, then its stream ends
        assert_eq!(rx_slow.recv().await.unwrap().data.as_ref(), "1");
        assert!(rx_slow.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_no_backlog() {
        let broadcaster = Arc::new(Broadcaster::new(8));
        broadcaster.publish("locations:update", &json!({ "n": 1 }));

        let mut subscription = broadcaster.open();
        let ping = subscription.next().await.unwrap();
        assert_eq!(ping.event, EVENT_PING);
        assert!(frame_json(&ping)["time"].is_i64());

        broadcaster.publish("locations:update", &json!({ "n": 2 }));
        let frame = subscription.next().await.unwrap();
        assert_eq!(frame_json(&frame), json!({ "n": 2 }));
    }

    #[tokio::test]
    async fn test_dropping_subscription_unregisters() {
        let broadcaster = Arc::new(Broadcaster::new(8));
        let subscription = broadcaster.open();
        let other = broadcaster.open();
        assert_eq!(broadcaster.connection_count(), 2);
        assert_ne!(subscription.id(), other.id());

        drop(subscription);
        assert_eq!(broadcaster.connection_count(), 1);
        drop(other);
        assert_eq!(broadcaster.connection_count(), 0);
    }
}
