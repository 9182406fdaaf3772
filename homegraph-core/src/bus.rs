use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
    pub received_at: DateTime<Utc>,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: Bytes) -> Self {
        Self { topic: topic.into(), payload, received_at: Utc::now() }
    }
}

pub type MessageStream = Box<dyn Stream<Item = Message> + Unpin + Send>;

/// Message bus carrying device state and commands. Patterns use MQTT topic filter syntax.
#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()>;
    async fn subscribe(&self, pattern: &str) -> Result<MessageStream>;
}

#[derive(Clone)]
pub struct InMemoryBus {
    tx: Arc<broadcast::Sender<Message>>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        Self { tx: Arc::new(tx) }
    }
}

#[async_trait]
impl Bus for InMemoryBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        let _ = self.tx.send(Message::new(topic, payload));
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<MessageStream> {
        Ok(filtered_stream(self.tx.subscribe(), pattern))
    }
}

/// Turns a broadcast receiver into a stream of messages matching `pattern`. Lagged
/// receivers skip the dropped messages.
pub fn filtered_stream(rx: broadcast::Receiver<Message>, pattern: &str) -> MessageStream {
    let pattern = pattern.to_string();
    let stream = BroadcastStream::new(rx).filter_map(move |item| match item {
        Ok(msg) if topic_matches(&pattern, &msg.topic) => Some(msg),
        _ => None,
    });
    Box::new(stream)
}

/// MQTT topic filter matching: `+` matches one level, a trailing `#` matches the rest
/// (including the parent level itself).
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == "#" || pattern == topic {
        return true;
    }
    let mut filter = pattern.split('/');
    let mut levels = topic.split('/');
    loop {
        match (filter.next(), levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_wildcard_filters() {
        assert!(topic_matches("home/kitchen/light", "home/kitchen/light"));
        assert!(topic_matches("home/+/light", "home/kitchen/light"));
        assert!(!topic_matches("home/+/light", "home/kitchen/lamp"));
        assert!(topic_matches("home/#", "home/kitchen/light/state"));
        assert!(topic_matches("home/#", "home"));
        assert!(topic_matches("#", "anything/at/all"));
        assert!(!topic_matches("home/kitchen", "home/kitchen/light"));
        assert!(!topic_matches("home/kitchen/light", "home/kitchen"));
    }

    #[tokio::test]
    async fn in_memory_bus_delivers_matching_messages_only() {
        let bus = InMemoryBus::default();
        let mut sub = bus.subscribe("lights/+/state").await.unwrap();

        bus.publish("switches/porch/state", Bytes::from_static(b"on")).await.unwrap();
        bus.publish("lights/kitchen/state", Bytes::from_static(b"off")).await.unwrap();

        let msg = sub.next().await.expect("message");
        assert_eq!(msg.topic, "lights/kitchen/state");
        assert_eq!(msg.payload, Bytes::from_static(b"off"));
    }
}
