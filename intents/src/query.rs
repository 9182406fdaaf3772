use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use homegraph_core::{
    error::RepositoryError, model::Device, repository::DeviceRepository, state::StateCache,
};
use serde_json::Value;

use crate::{
    IntentHandler,
    error::IntentError,
    protocol::{DeviceStatus, QueryIntent, QueryResponsePayload, error_codes},
};

/// Answers QUERY from the trait state mappings and the last payloads seen on the bus.
pub struct QueryIntentHandler {
    repository: Arc<DeviceRepository>,
    states: Arc<StateCache>,
}

impl QueryIntentHandler {
    pub fn new(repository: Arc<DeviceRepository>, states: Arc<StateCache>) -> Self {
        Self { repository, states }
    }

    async fn device_states(&self, device: &Device) -> BTreeMap<String, Value> {
        let mut states = BTreeMap::new();
        for (key, topic) in device.traits.iter().flat_map(|t| t.state.iter()) {
            if let Some(cached) = self.states.get(topic).await {
                states.insert(key.clone(), cached.value());
            }
        }
        states
    }
}

#[async_trait]
impl IntentHandler for QueryIntentHandler {
    type Intent = QueryIntent;
    type Payload = QueryResponsePayload;

    async fn handle(&self, intent: QueryIntent) -> Result<QueryResponsePayload, IntentError> {
        tracing::info!(devices = intent.devices.len(), "received QUERY intent");

        let mut devices = BTreeMap::new();
        for requested in intent.devices {
            let status = match self.repository.get(&requested.id).await {
                Ok(device) => DeviceStatus::online(self.device_states(&device).await),
                Err(RepositoryError::NotFound(_)) => {
                    tracing::warn!(device_id = %requested.id, "QUERY for unknown device");
                    DeviceStatus::error(error_codes::DEVICE_NOT_FOUND)
                }
                Err(e) => return Err(e.into()),
            };
            devices.insert(requested.id, status);
        }

        Ok(QueryResponsePayload { devices })
    }
}
