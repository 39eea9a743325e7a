//! Typed publish/subscribe bus for channel state changes
//!
//! Subscribers register for a `(unique_id, signal)` pair and receive the
//! `(attribute, value)` payloads published under it.

use conduit_core::{AttributeName, AttributeValue};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Default per-key subscriber buffer
pub const DEFAULT_CAPACITY: usize = 64;

/// Named event a channel publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Any attribute of the cluster changed
    AttributeUpdated,
    /// The fan speed changed or was refreshed
    SetFan,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::AttributeUpdated => "attribute_updated",
            Signal::SetFan => "set_fan",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub unique_id: String,
    pub signal: Signal,
}

impl SignalKey {
    pub fn new(unique_id: impl Into<String>, signal: Signal) -> Self {
        Self {
            unique_id: unique_id.into(),
            signal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalPayload {
    pub attribute: AttributeName,
    pub value: AttributeValue,
}

/// Process-wide dispatch bus; clones share subscriptions
#[derive(Debug, Clone)]
pub struct Dispatcher {
    senders: Arc<Mutex<HashMap<SignalKey, broadcast::Sender<SignalPayload>>>>,
    capacity: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Dispatcher {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to one signal of one channel
    pub fn subscribe(&self, unique_id: &str, signal: Signal) -> broadcast::Receiver<SignalPayload> {
        let mut senders = self.senders.lock();
        senders
            .entry(SignalKey::new(unique_id, signal))
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish a payload; returns how many subscribers received it
    pub fn publish(&self, unique_id: &str, signal: Signal, payload: SignalPayload) -> usize {
        let key = SignalKey::new(unique_id, signal);
        let mut senders = self.senders.lock();

        let Some(sender) = senders.get(&key) else {
            trace!(channel = %unique_id, signal = %signal, "No subscribers");
            return 0;
        };

        match sender.send(payload) {
            Ok(count) => count,
            Err(_) => {
                // Every receiver is gone
                senders.remove(&key);
                0
            }
        }
    }

    /// Number of live subscribers for a key
    pub fn subscriber_count(&self, unique_id: &str, signal: Signal) -> usize {
        self.senders
            .lock()
            .get(&SignalKey::new(unique_id, signal))
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: u64) -> SignalPayload {
        SignalPayload {
            attribute: AttributeName::Known("fan_mode".to_string()),
            value: AttributeValue::UInt(value),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_key_only() {
        let bus = Dispatcher::default();
        let mut updated = bus.subscribe("dev:1:0x0202", Signal::AttributeUpdated);
        let mut fan = bus.subscribe("dev:1:0x0202", Signal::SetFan);
        let mut other = bus.subscribe("dev:2:0x0202", Signal::AttributeUpdated);

        assert_eq!(bus.publish("dev:1:0x0202", Signal::AttributeUpdated, payload(2)), 1);

        assert_eq!(updated.recv().await.unwrap(), payload(2));
        assert!(fan.try_recv().is_err());
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = Dispatcher::default();
        assert_eq!(bus.publish("nobody", Signal::SetFan, payload(1)), 0);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let bus = Dispatcher::default();
        let rx = bus.subscribe("dev", Signal::SetFan);
        assert_eq!(bus.subscriber_count("dev", Signal::SetFan), 1);
        drop(rx);

        assert_eq!(bus.publish("dev", Signal::SetFan, payload(1)), 0);
        assert_eq!(bus.subscriber_count("dev", Signal::SetFan), 0);
    }

    #[test]
    fn test_clones_share_subscriptions() {
        let bus = Dispatcher::default();
        let mut rx = bus.subscribe("dev", Signal::AttributeUpdated);
        let clone = bus.clone();
        assert_eq!(clone.publish("dev", Signal::AttributeUpdated, payload(5)), 1);
        assert_eq!(rx.try_recv().unwrap(), payload(5));
    }
}
