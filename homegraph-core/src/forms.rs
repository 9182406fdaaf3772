use serde::{Deserialize, Serialize};

use crate::model::{Device, DeviceInfo, DeviceType, NameInfo};

/// Splits a comma separated field into trimmed, non-empty entries, keeping their order.
pub fn parse_comma_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Flat edit payload for a device. List fields travel comma-joined.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceForm {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub room_hint: Option<String>,
    pub will_report_state: bool,
    pub default_names: String,
    pub nicknames: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub hw_version: Option<String>,
    pub sw_version: Option<String>,
}

impl DeviceForm {
    /// Builds a new device with no traits.
    pub fn into_device(self) -> Device {
        let mut device = Device::new(String::new(), String::new(), DeviceType::default());
        self.apply_to(&mut device);
        device
    }

    /// Overwrites the form-owned fields; traits and custom data stay as they are.
    pub fn apply_to(&self, device: &mut Device) {
        device.id = self.id.trim().to_string();
        device.device_type = DeviceType::from(self.device_type.trim());
        device.room_hint =
            self.room_hint.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        device.will_report_state = self.will_report_state;
        device.name = NameInfo {
            name: self.name.trim().to_string(),
            default_names: parse_comma_list(&self.default_names),
            nicknames: parse_comma_list(&self.nicknames),
        };
        device.device_info = DeviceInfo::from_parts(
            self.manufacturer.as_deref(),
            self.model.as_deref(),
            self.hw_version.as_deref(),
            self.sw_version.as_deref(),
        );
    }
}

impl From<&Device> for DeviceForm {
    fn from(device: &Device) -> Self {
        let info = device.device_info.clone().unwrap_or_default();
        Self {
            id: device.id.clone(),
            name: device.name.name.clone(),
            device_type: device.device_type.to_string(),
            room_hint: device.room_hint.clone(),
            will_report_state: device.will_report_state,
            default_names: device.name.default_names.join(","),
            nicknames: device.name.nicknames.join(","),
            manufacturer: info.manufacturer,
            model: info.model,
            hw_version: info.hw_version,
            sw_version: info.sw_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceTrait, TraitType};

    #[test]
    fn comma_list_trims_and_drops_empty_entries() {
        assert_eq!(parse_comma_list(" lamp, ceiling light ,,  "), vec!["lamp", "ceiling light"]);
        assert!(parse_comma_list("").is_empty());
    }

    #[test]
    fn form_builds_device_without_device_info_when_blank() {
        let form = DeviceForm {
            id: "light1".into(),
            name: "Kitchen Light".into(),
            device_type: "action.devices.types.LIGHT".into(),
            room_hint: Some("".into()),
            default_names: "Lamp, Light".into(),
            manufacturer: Some("".into()),
            ..Default::default()
        };
        let device = form.into_device();
        assert_eq!(device.device_type, DeviceType::Light);
        assert_eq!(device.name.default_names, vec!["Lamp", "Light"]);
        assert!(device.name.nicknames.is_empty());
        assert!(device.room_hint.is_none());
        assert!(device.device_info.is_none());
    }

    #[test]
    fn apply_keeps_traits_and_custom_data() {
        let mut device = Device::new("sw1", "Porch", DeviceType::Switch)
            .with_trait(DeviceTrait::new(TraitType::OnOff));
        device.custom_data = Some([("zone".to_string(), serde_json::json!(3))].into());

        let mut form = DeviceForm::from(&device);
        form.name = "Porch Switch".into();
        form.model = Some("PS-1".into());
        form.apply_to(&mut device);

        assert_eq!(device.name.name, "Porch Switch");
        assert_eq!(device.traits.len(), 1);
        assert!(device.custom_data.is_some());
        assert_eq!(device.device_info.unwrap().model.as_deref(), Some("PS-1"));
    }
}
