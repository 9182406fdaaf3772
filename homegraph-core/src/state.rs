use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::bus::Message;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedState {
    pub payload: String,
    pub received_at: DateTime<Utc>,
}

impl CachedState {
    /// The payload as JSON when it parses, otherwise as a plain string.
    pub fn value(&self) -> serde_json::Value {
        serde_json::from_str(&self.payload)
            .unwrap_or_else(|_| serde_json::Value::String(self.payload.clone()))
    }
}

/// Last payload seen on each bus topic.
#[derive(Default)]
pub struct StateCache {
    inner: RwLock<HashMap<String, CachedState>>,
}

impl StateCache {
    pub async fn record(&self, msg: &Message) {
        let payload = String::from_utf8_lossy(&msg.payload).trim().to_string();
        let state = CachedState { payload, received_at: msg.received_at };
        self.inner.write().await.insert(msg.topic.clone(), state);
    }

    pub async fn get(&self, topic: &str) -> Option<CachedState> {
        self.inner.read().await.get(topic).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    #[tokio::test]
    async fn keeps_last_payload_per_topic() {
        let cache = StateCache::default();
        cache.record(&Message::new("kitchen/light", Bytes::from_static(b"false"))).await;
        cache.record(&Message::new("kitchen/light", Bytes::from_static(b"true"))).await;

        let state = cache.get("kitchen/light").await.unwrap();
        assert_eq!(state.value(), json!(true));
        assert_eq!(cache.len().await, 1);
    }

    #[test]
    fn non_json_payload_is_a_string() {
        let state = CachedState { payload: "heat".into(), received_at: Utc::now() };
        assert_eq!(state.value(), json!("heat"));
        let state = CachedState { payload: "42.5".into(), received_at: Utc::now() };
        assert_eq!(state.value(), json!(42.5));
    }
}
