//! Wire types of the smart home fulfillment protocol.

use std::collections::BTreeMap;

use homegraph_core::model::{Attributes, DeviceInfo, DeviceType, NameInfo, TraitType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentRequest {
    pub request_id: String,
    #[serde(default)]
    pub inputs: Vec<Intent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "intent", content = "payload")]
pub enum Intent {
    #[serde(rename = "action.devices.SYNC")]
    Sync,
    #[serde(rename = "action.devices.QUERY")]
    Query(QueryIntent),
    #[serde(rename = "action.devices.EXECUTE")]
    Execute(ExecuteIntent),
    #[serde(rename = "action.devices.DISCONNECT")]
    Disconnect,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Sync => "SYNC",
            Intent::Query(_) => "QUERY",
            Intent::Execute(_) => "EXECUTE",
            Intent::Disconnect => "DISCONNECT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentResponse {
    pub request_id: String,
    pub payload: ResponsePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponsePayload {
    Sync(SyncResponsePayload),
    Query(QueryResponsePayload),
    Execute(ExecuteResponsePayload),
    Error(ErrorPayload),
    Empty {},
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponsePayload {
    pub agent_user_id: String,
    pub devices: Vec<SyncDevice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncDevice {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub traits: Vec<TraitType>,
    pub name: NameInfo,
    pub will_report_state: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_hint: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryIntent {
    pub devices: Vec<DeviceRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponsePayload {
    pub devices: BTreeMap<String, DeviceStatus>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Success,
    Pending,
    Offline,
    Exceptions,
    Error,
}

/// Per-device answer for QUERY: status plus the state keys that are known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub status: CommandStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(flatten)]
    pub states: BTreeMap<String, Value>,
}

impl DeviceStatus {
    pub fn online(states: BTreeMap<String, Value>) -> Self {
        Self { status: CommandStatus::Success, error_code: None, online: Some(true), states }
    }

    pub fn error(code: &str) -> Self {
        Self {
            status: CommandStatus::Error,
            error_code: Some(code.to_string()),
            online: None,
            states: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteIntent {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Command {
    pub devices: Vec<DeviceRef>,
    pub execution: Vec<Execution>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Execution {
    pub command: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteResponsePayload {
    pub commands: Vec<CommandResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub ids: Vec<String>,
    pub status: CommandStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

pub mod error_codes {
    pub const DEVICE_NOT_FOUND: &str = "deviceNotFound";
    pub const FUNCTION_NOT_SUPPORTED: &str = "functionNotSupported";
    pub const TRANSIENT_ERROR: &str = "transientError";
    pub const PROTOCOL_ERROR: &str = "protocolError";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_sync_request_without_payload() {
        let req: FulfillmentRequest = serde_json::from_value(json!({
            "requestId": "ff36a3cc",
            "inputs": [{ "intent": "action.devices.SYNC" }]
        }))
        .unwrap();
        assert_eq!(req.inputs, vec![Intent::Sync]);
    }

    #[test]
    fn parses_execute_request() {
        let req: FulfillmentRequest = serde_json::from_value(json!({
            "requestId": "1",
            "inputs": [{
                "intent": "action.devices.EXECUTE",
                "payload": { "commands": [{
                    "devices": [{ "id": "light1" }],
                    "execution": [{ "command": "action.devices.commands.OnOff", "params": { "on": true } }]
                }]}
            }]
        }))
        .unwrap();
        let Intent::Execute(exec) = &req.inputs[0] else { panic!("expected execute") };
        assert_eq!(exec.commands[0].execution[0].params["on"], json!(true));
    }

    #[test]
    fn device_status_flattens_states() {
        let status = DeviceStatus::online([("on".to_string(), json!(true))].into());
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({ "status": "SUCCESS", "online": true, "on": true })
        );
    }
}
