use serde::{Deserialize, Deserializer, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

pub type Attributes = BTreeMap<String, serde_json::Value>;

/// One device exposed to the assistant. Field names follow the Home Graph wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub traits: Vec<DeviceTrait>,
    pub name: NameInfo,
    #[serde(default)]
    pub will_report_state: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<BTreeMap<String, serde_json::Value>>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            id: id.into(),
            device_type,
            traits: Vec::new(),
            name: NameInfo::new(name),
            will_report_state: false,
            room_hint: None,
            device_info: None,
            custom_data: None,
        }
    }

    pub fn with_trait(mut self, device_trait: DeviceTrait) -> Self {
        self.traits.push(device_trait);
        self
    }

    pub fn find_trait(&self, kind: &TraitType) -> Option<&DeviceTrait> {
        self.traits.iter().find(|t| &t.kind == kind)
    }

    /// Replaces the trait of the same kind in place, or appends it.
    pub fn upsert_trait(&mut self, device_trait: DeviceTrait) {
        match self.traits.iter_mut().find(|t| t.kind == device_trait.kind) {
            Some(existing) => *existing = device_trait,
            None => self.traits.push(device_trait),
        }
    }

    pub fn remove_trait(&mut self, kind: &TraitType) -> Option<DeviceTrait> {
        let idx = self.traits.iter().position(|t| &t.kind == kind)?;
        Some(self.traits.remove(idx))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NameInfo {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub default_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub nicknames: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl NameInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), default_names: Vec::new(), nicknames: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    /// Builds the block only when at least one part is non-empty. Empty parts become `None`.
    pub fn from_parts(
        manufacturer: Option<&str>,
        model: Option<&str>,
        hw_version: Option<&str>,
        sw_version: Option<&str>,
    ) -> Option<Self> {
        let info = Self {
            manufacturer: non_empty(manufacturer),
            model: non_empty(model),
            hw_version: non_empty(hw_version),
            sw_version: non_empty(sw_version),
        };
        (!info.is_empty()).then_some(info)
    }

    pub fn is_empty(&self) -> bool {
        [&self.manufacturer, &self.model, &self.hw_version, &self.sw_version]
            .into_iter()
            .all(|field| field.as_deref().is_none_or(str::is_empty))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// A capability attached to a device.
///
/// `attributes` are static capability parameters reported on SYNC. `commands` maps an
/// assistant command to its parameters and the bus topic each parameter is published to;
/// `state` maps a state key to the topic whose last payload answers QUERY.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceTrait {
    #[serde(rename = "trait")]
    pub kind: TraitType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub commands: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state: BTreeMap<String, String>,
}

impl DeviceTrait {
    pub fn new(kind: TraitType) -> Self {
        Self { kind, attributes: None, commands: BTreeMap::new(), state: BTreeMap::new() }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.get_or_insert_with(BTreeMap::new).insert(key.into(), value);
        self
    }

    pub fn with_command(
        mut self,
        command: impl Into<String>,
        param: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        self.commands.entry(command.into()).or_default().insert(param.into(), topic.into());
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, topic: impl Into<String>) -> Self {
        self.state.insert(key.into(), topic.into());
        self
    }
}

/// Generates a protocol enumeration that serializes as `<prefix><name>` and keeps unknown
/// values instead of rejecting them.
macro_rules! protocol_enum {
    ($(#[$meta:meta])* $ty:ident, $prefix:literal, { $($variant:ident => $name:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $ty {
            $($variant,)+
            Unrecognized(String),
        }

        impl $ty {
            pub const PREFIX: &'static str = $prefix;

            /// Short protocol name, e.g. `LIGHT` or `OnOff`.
            pub fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $name,)+
                    Self::Unrecognized(raw) => raw.strip_prefix(Self::PREFIX).unwrap_or(raw),
                }
            }

            pub fn is_recognized(&self) -> bool {
                !matches!(self, Self::Unrecognized(_))
            }
        }

        impl From<String> for $ty {
            fn from(raw: String) -> Self {
                let short = raw.strip_prefix(Self::PREFIX).unwrap_or(&raw);
                match short {
                    $($name => Self::$variant,)+
                    _ => Self::Unrecognized(raw),
                }
            }
        }

        impl From<&str> for $ty {
            fn from(raw: &str) -> Self {
                Self::from(raw.to_string())
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.to_string()
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Unrecognized(raw) => f.write_str(raw),
                    other => write!(f, "{}{}", Self::PREFIX, other.name()),
                }
            }
        }
    };
}

protocol_enum!(
    /// Assistant-recognized device category.
    DeviceType, "action.devices.types.", {
        AcUnit => "AC_UNIT",
        AirCooler => "AIRCOOLER",
        AirFreshener => "AIRFRESHENER",
        AirPurifier => "AIRPURIFIER",
        AudioVideoReceiver => "AUDIO_VIDEO_RECEIVER",
        Awning => "AWNING",
        Bathtub => "BATHTUB",
        Bed => "BED",
        Blender => "BLENDER",
        Blinds => "BLINDS",
        Boiler => "BOILER",
        Camera => "CAMERA",
        CarbonMonoxideDetector => "CARBON_MONOXIDE_DETECTOR",
        Charger => "CHARGER",
        Closet => "CLOSET",
        CoffeeMaker => "COFFEE_MAKER",
        Cooktop => "COOKTOP",
        Curtain => "CURTAIN",
        Dehumidifier => "DEHUMIDIFIER",
        Dehydrator => "DEHYDRATOR",
        Dishwasher => "DISHWASHER",
        Door => "DOOR",
        Doorbell => "DOORBELL",
        Drawer => "DRAWER",
        Dryer => "DRYER",
        Fan => "FAN",
        Faucet => "FAUCET",
        Fireplace => "FIREPLACE",
        Freezer => "FREEZER",
        Fryer => "FRYER",
        Garage => "GARAGE",
        Gate => "GATE",
        Grill => "GRILL",
        Heater => "HEATER",
        Hood => "HOOD",
        Humidifier => "HUMIDIFIER",
        Kettle => "KETTLE",
        Light => "LIGHT",
        Lock => "LOCK",
        Microwave => "MICROWAVE",
        Mop => "MOP",
        Mower => "MOWER",
        Multicooker => "MULTICOOKER",
        Network => "NETWORK",
        Outlet => "OUTLET",
        Oven => "OVEN",
        Pergola => "PERGOLA",
        PetFeeder => "PETFEEDER",
        PressureCooker => "PRESSURECOOKER",
        Radiator => "RADIATOR",
        Refrigerator => "REFRIGERATOR",
        Remote => "REMOTECONTROL",
        Router => "ROUTER",
        Scene => "SCENE",
        SecuritySystem => "SECURITYSYSTEM",
        Sensor => "SENSOR",
        SetTop => "SETTOP",
        Shower => "SHOWER",
        Shutter => "SHUTTER",
        SmokeDetector => "SMOKE_DETECTOR",
        Soundbar => "SOUNDBAR",
        SousVide => "SOUSVIDE",
        Speaker => "SPEAKER",
        Sprinkler => "SPRINKLER",
        StandMixer => "STANDMIXER",
        StreamingBox => "STREAMING_BOX",
        StreamingSoundbar => "STREAMING_SOUNDBAR",
        StreamingStick => "STREAMING_STICK",
        Switch => "SWITCH",
        Thermostat => "THERMOSTAT",
        Tv => "TV",
        Vacuum => "VACUUM",
        Valve => "VALVE",
        Washer => "WASHER",
        WaterHeater => "WATERHEATER",
        WaterPurifier => "WATERPURIFIER",
        WaterSoftener => "WATERSOFTENER",
        Window => "WINDOW",
        YogurtMaker => "YOGURTMAKER",
    }
);

protocol_enum!(
    /// Capability kind a device can declare.
    TraitType, "action.devices.traits.", {
        AppSelector => "AppSelector",
        ArmDisarm => "ArmDisarm",
        Brightness => "Brightness",
        CameraStream => "CameraStream",
        Channel => "Channel",
        ColorSetting => "ColorSetting",
        Cook => "Cook",
        Dispense => "Dispense",
        Dock => "Dock",
        EnergyStorage => "EnergyStorage",
        FanSpeed => "FanSpeed",
        Fill => "Fill",
        HumiditySetting => "HumiditySetting",
        InputSelector => "InputSelector",
        LightEffects => "LightEffects",
        Locator => "Locator",
        LockUnlock => "LockUnlock",
        MediaState => "MediaState",
        Modes => "Modes",
        NetworkControl => "NetworkControl",
        ObjectDetection => "ObjectDetection",
        OnOff => "OnOff",
        OpenClose => "OpenClose",
        Reboot => "Reboot",
        Rotation => "Rotation",
        RunCycle => "RunCycle",
        Scene => "Scene",
        SensorState => "SensorState",
        SoftwareUpdate => "SoftwareUpdate",
        StartStop => "StartStop",
        StatusReport => "StatusReport",
        TemperatureControl => "TemperatureControl",
        TemperatureSetting => "TemperatureSetting",
        Timer => "Timer",
        Toggles => "Toggles",
        TransportControl => "TransportControl",
        Volume => "Volume",
    }
);

impl Default for DeviceType {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_name_lists_read_as_empty() {
        let name: NameInfo = serde_json::from_value(json!({
            "name": "Porch",
            "defaultNames": null,
            "nicknames": null
        }))
        .unwrap();
        assert_eq!(name, NameInfo::new("Porch"));

        let name: NameInfo = serde_json::from_value(json!({ "name": "Porch" })).unwrap();
        assert!(name.default_names.is_empty() && name.nicknames.is_empty());
    }

    #[test]
    fn device_info_absent_when_all_parts_empty() {
        assert_eq!(DeviceInfo::from_parts(None, Some(""), Some("  "), None), None);
    }

    #[test]
    fn device_info_keeps_only_non_empty_parts() {
        let info = DeviceInfo::from_parts(Some("Acme"), Some(""), None, None).unwrap();
        assert_eq!(info.manufacturer.as_deref(), Some("Acme"));
        assert!(info.model.is_none());
        assert!(info.hw_version.is_none());
        assert!(info.sw_version.is_none());
    }

    #[test]
    fn protocol_names_use_full_prefix_on_the_wire() {
        let device = Device::new("light1", "Kitchen Light", DeviceType::Light)
            .with_trait(DeviceTrait::new(TraitType::OnOff));
        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["type"], json!("action.devices.types.LIGHT"));
        assert_eq!(value["traits"][0]["trait"], json!("action.devices.traits.OnOff"));
        assert_eq!(value["name"]["defaultNames"], json!([]));
        assert!(value.get("deviceInfo").is_none());
    }

    #[test]
    fn unknown_protocol_names_are_preserved() {
        let kind: TraitType =
            serde_json::from_value(json!("action.devices.traits.Teleport")).unwrap();
        assert!(!kind.is_recognized());
        assert_eq!(kind.name(), "Teleport");
        assert_eq!(serde_json::to_value(&kind).unwrap(), json!("action.devices.traits.Teleport"));
    }

    #[test]
    fn short_names_parse_to_known_variants() {
        assert_eq!(DeviceType::from("THERMOSTAT"), DeviceType::Thermostat);
        assert_eq!(TraitType::from("action.devices.traits.Brightness"), TraitType::Brightness);
    }

    #[test]
    fn missing_name_lists_deserialize_as_empty() {
        let device: Device = serde_json::from_value(json!({
            "id": "sw1",
            "type": "action.devices.types.SWITCH",
            "name": { "name": "Porch" }
        }))
        .unwrap();
        assert!(device.name.default_names.is_empty());
        assert!(device.name.nicknames.is_empty());
        assert!(device.traits.is_empty());
    }

    #[test]
    fn upsert_trait_replaces_same_kind_in_place() {
        let mut device = Device::new("d", "D", DeviceType::Light)
            .with_trait(DeviceTrait::new(TraitType::OnOff))
            .with_trait(DeviceTrait::new(TraitType::Brightness));
        device.upsert_trait(DeviceTrait::new(TraitType::OnOff).with_attribute("x", json!(1)));
        assert_eq!(device.traits.len(), 2);
        assert_eq!(device.traits[0].kind, TraitType::OnOff);
        assert!(device.traits[0].attributes.is_some());
    }
}
