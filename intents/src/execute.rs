use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use homegraph_core::{
    bus::Bus, error::RepositoryError, model::Device, repository::DeviceRepository,
};
use serde_json::Value;

use crate::{
    IntentHandler,
    error::IntentError,
    protocol::{
        CommandResult, CommandStatus, ExecuteIntent, ExecuteResponsePayload, Execution,
        error_codes,
    },
};

/// Applies EXECUTE commands by publishing mapped parameters on the bus.
pub struct ExecuteIntentHandler {
    repository: Arc<DeviceRepository>,
    bus: Arc<dyn Bus>,
}

enum Outcome {
    Applied(BTreeMap<String, Value>),
    Failed(&'static str),
}

impl ExecuteIntentHandler {
    pub fn new(repository: Arc<DeviceRepository>, bus: Arc<dyn Bus>) -> Self {
        Self { repository, bus }
    }

    async fn apply(&self, device: &Device, executions: &[Execution]) -> Outcome {
        let mut states = BTreeMap::new();
        for execution in executions {
            let mapped = device.traits.iter().find_map(|t| t.commands.get(&execution.command));
            let Some(params) = mapped else {
                tracing::warn!(
                    device_id = %device.id,
                    command = %execution.command,
                    "command not mapped"
                );
                return Outcome::Failed(error_codes::FUNCTION_NOT_SUPPORTED);
            };

            for (param, value) in &execution.params {
                let Some(topic) = params.get(param) else {
                    tracing::debug!(device_id = %device.id, param = %param, "param not mapped");
                    continue;
                };
                if let Err(e) = self.bus.publish(topic, payload_for(value)).await {
                    tracing::warn!(
                        device_id = %device.id,
                        topic = %topic,
                        error = %e,
                        "command publish failed"
                    );
                    return Outcome::Failed(error_codes::TRANSIENT_ERROR);
                }
                states.insert(param.clone(), value.clone());
            }
        }
        states.insert("online".to_string(), Value::Bool(true));
        Outcome::Applied(states)
    }
}

fn payload_for(value: &Value) -> Bytes {
    match value {
        Value::String(s) => Bytes::from(s.clone()),
        other => Bytes::from(other.to_string()),
    }
}

#[async_trait]
impl IntentHandler for ExecuteIntentHandler {
    type Intent = ExecuteIntent;
    type Payload = ExecuteResponsePayload;

    async fn handle(&self, intent: ExecuteIntent) -> Result<ExecuteResponsePayload, IntentError> {
        tracing::info!(commands = intent.commands.len(), "received EXECUTE intent");

        let mut results = Vec::new();
        for command in intent.commands {
            for target in command.devices {
                let outcome = match self.repository.get(&target.id).await {
                    Ok(device) => self.apply(&device, &command.execution).await,
                    Err(RepositoryError::NotFound(_)) => {
                        Outcome::Failed(error_codes::DEVICE_NOT_FOUND)
                    }
                    Err(e) => return Err(e.into()),
                };
                results.push(match outcome {
                    Outcome::Applied(states) => CommandResult {
                        ids: vec![target.id],
                        status: CommandStatus::Success,
                        states: Some(states),
                        error_code: None,
                    },
                    Outcome::Failed(code) => CommandResult {
                        ids: vec![target.id],
                        status: CommandStatus::Error,
                        states: None,
                        error_code: Some(code.to_string()),
                    },
                });
            }
        }

        Ok(ExecuteResponsePayload { commands: results })
    }
}
