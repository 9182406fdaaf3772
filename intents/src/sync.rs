use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
    sync::Arc,
};

use async_trait::async_trait;
use homegraph_core::{
    model::{Attributes, Device, DeviceTrait},
    repository::DeviceRepository,
    settings::{AGENT_USER_ID, ConfigSource},
};

use crate::{
    IntentHandler,
    error::IntentError,
    protocol::{SyncDevice, SyncResponsePayload},
};

/// How trait attributes sharing a key are combined into the device attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeMerge {
    /// Later traits overwrite earlier ones, in declaration order.
    #[default]
    LastWriteWins,
    /// Conflicting values for the same key fail the sync.
    Strict,
}

impl FromStr for AttributeMerge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last-write-wins" | "lww" => Ok(AttributeMerge::LastWriteWins),
            "strict" => Ok(AttributeMerge::Strict),
            other => Err(format!("unknown attribute merge policy: {other}")),
        }
    }
}

impl Display for AttributeMerge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeMerge::LastWriteWins => "last-write-wins",
            AttributeMerge::Strict => "strict",
        })
    }
}

/// Merges the attributes of `traits` in order. Returns the merged map or the first key
/// declared twice with different values when `policy` is strict.
pub fn merge_attributes(
    device_id: &str,
    traits: &[DeviceTrait],
    policy: AttributeMerge,
) -> Result<Attributes, IntentError> {
    let mut merged = Attributes::new();
    for attrs in traits.iter().filter_map(|t| t.attributes.as_ref()) {
        for (key, value) in attrs {
            if let Some(previous) = merged.get(key)
                && previous != value
            {
                if policy == AttributeMerge::Strict {
                    return Err(IntentError::AttributeCollision {
                        device: device_id.to_string(),
                        key: key.clone(),
                    });
                }
                tracing::warn!(device_id, key = %key, "attribute overwritten by a later trait");
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(merged)
}

pub struct SyncIntentHandler {
    repository: Arc<DeviceRepository>,
    config: Arc<dyn ConfigSource>,
    merge: AttributeMerge,
}

impl SyncIntentHandler {
    pub fn new(
        repository: Arc<DeviceRepository>,
        config: Arc<dyn ConfigSource>,
        merge: AttributeMerge,
    ) -> Self {
        Self { repository, config, merge }
    }

    fn project(&self, device: Device) -> Result<SyncDevice, IntentError> {
        let attributes = merge_attributes(&device.id, &device.traits, self.merge)?;
        Ok(SyncDevice {
            traits: device.traits.into_iter().map(|t| t.kind).collect(),
            id: device.id,
            device_type: device.device_type,
            name: device.name,
            will_report_state: device.will_report_state,
            room_hint: device.room_hint,
            attributes,
            device_info: device.device_info,
            custom_data: device.custom_data,
        })
    }
}

#[async_trait]
impl IntentHandler for SyncIntentHandler {
    type Intent = ();
    type Payload = SyncResponsePayload;

    async fn handle(&self, _intent: ()) -> Result<SyncResponsePayload, IntentError> {
        tracing::info!("received SYNC intent");

        let agent_user_id = self.config.get_or_default(AGENT_USER_ID);
        let devices = self
            .repository
            .get_all()
            .await
            .into_iter()
            .map(|d| self.project(d))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(devices = devices.len(), "SYNC response assembled");
        Ok(SyncResponsePayload { agent_user_id, devices })
    }
}
