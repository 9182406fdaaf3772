use std::sync::Arc;

use adapter_mqtt::MqttBus;
use anyhow::{Ok, Result};
use homegraph_core::{
    bus::{Bus, InMemoryBus},
    repository::DeviceRepository,
    settings::ConfigSource,
    state::StateCache,
    storage::{DeviceStore, InMemoryStore, JsonFileStore},
};
use intents::FulfillmentService;

use crate::{
    config::{BusKind, Config, StorageKind},
    state::AppState,
};

pub async fn build_state(cfg: &Config) -> Result<AppState> {
    let bus: Arc<dyn Bus> = match cfg.bus {
        BusKind::InMem => Arc::new(InMemoryBus::default()),
        BusKind::Mqtt => Arc::new(
            MqttBus::connect(
                &cfg.mqtt.host,
                cfg.mqtt.port,
                &cfg.mqtt.client_id,
                &cfg.mqtt.topic_filter,
            )
            .await?,
        ),
    };

    let store: Arc<dyn DeviceStore> = match cfg.storage {
        StorageKind::InMem => Arc::new(InMemoryStore::default()),
        StorageKind::File => Arc::new(JsonFileStore::new(&cfg.devices_file)),
    };

    let repository = Arc::new(DeviceRepository::load(store).await?);
    Ok(assemble(repository, bus, Arc::new(cfg.clone()), cfg))
}

/// Wires the handlers around an existing repository and bus.
pub fn assemble(
    repository: Arc<DeviceRepository>,
    bus: Arc<dyn Bus>,
    settings: Arc<dyn ConfigSource>,
    cfg: &Config,
) -> AppState {
    let states = Arc::new(StateCache::default());
    let fulfillment = Arc::new(FulfillmentService::new(
        repository.clone(),
        states.clone(),
        bus.clone(),
        settings,
        cfg.attribute_merge,
    ));
    AppState { repository, bus, states, fulfillment }
}
