use anyhow::{Result, anyhow};
use dotenv::dotenv;
use homegraph_core::settings::{AGENT_USER_ID, ConfigSource};
use intents::sync::AttributeMerge;
use std::{
    fmt::{self, Display, Formatter},
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
};
use url::Url;

#[derive(Clone, Debug, PartialEq)]
pub enum BusKind {
    InMem,
    Mqtt,
}

impl FromStr for BusKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inmem" => Ok(BusKind::InMem),
            "mqtt" => Ok(BusKind::Mqtt),
            other => Err(anyhow!("unknown bus kind: {other}")),
        }
    }
}

impl BusKind {
    fn as_str(&self) -> &'static str {
        match self {
            BusKind::InMem => "inmem",
            BusKind::Mqtt => "mqtt",
        }
    }
}

impl Display for BusKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StorageKind {
    InMem,
    File,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inmem" => Ok(StorageKind::InMem),
            "file" => Ok(StorageKind::File),
            other => Err(anyhow!("unknown storage kind: {other}")),
        }
    }
}

impl StorageKind {
    fn as_str(&self) -> &'static str {
        match self {
            StorageKind::InMem => "inmem",
            StorageKind::File => "file",
        }
    }
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind: SocketAddr,
    pub bus: BusKind,
    pub mqtt: MqttConfig,
    pub storage: StorageKind,
    pub devices_file: PathBuf,
    pub agent_user_id: Option<String>,
    pub attribute_merge: AttributeMerge,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            bus: BusKind::InMem,
            mqtt: MqttConfig::default(),
            storage: StorageKind::File,
            devices_file: PathBuf::from("googleDevices.json"),
            agent_user_id: None,
            attribute_merge: AttributeMerge::LastWriteWins,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from a variable lookup, starting from the defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut c = Self::default();
        if let Some(s) = var("HOMEGRAPH_BIND") {
            c.bind = s.parse()?;
        }
        if let Some(s) = var("HOMEGRAPH_BUS") {
            c.bus = s.parse()?;
        }
        if let Some(conn) = var("HOMEGRAPH_MQTT_URL") {
            c.mqtt = MqttConfig::from_connection_string(&conn)?;
        }
        if let Some(s) = var("HOMEGRAPH_MQTT_HOST") {
            c.mqtt.host = s;
        }
        if let Some(s) = var("HOMEGRAPH_MQTT_PORT") {
            c.mqtt.port = s.parse()?;
        }
        if let Some(s) = var("HOMEGRAPH_MQTT_CLIENT_ID") {
            c.mqtt.client_id = s;
        }
        if let Some(s) = var("HOMEGRAPH_MQTT_TOPIC") {
            c.mqtt.topic_filter = s;
        }
        if let Some(s) = var("HOMEGRAPH_STORAGE") {
            c.storage = s.parse()?;
        }
        if let Some(s) = var("HOMEGRAPH_DEVICES_FILE") {
            c.devices_file = PathBuf::from(s);
        }
        if let Some(s) = var("HOMEGRAPH_AGENT_USER_ID") {
            c.agent_user_id = Some(s);
        }
        if let Some(s) = var("HOMEGRAPH_ATTRIBUTE_MERGE") {
            c.attribute_merge = s.parse().map_err(|e: String| anyhow!(e))?;
        }
        Ok(c)
    }
}

impl ConfigSource for Config {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            AGENT_USER_ID => self.agent_user_id.clone(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic_filter: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_id: "homegraphd".to_string(),
            topic_filter: "#".to_string(),
        }
    }
}

impl MqttConfig {
    fn from_connection_string(conn: &str) -> Result<Self> {
        let url = Url::parse(conn)?;
        if url.scheme() != "mqtt" {
            anyhow::bail!("unsupported mqtt url scheme: {}", url.scheme());
        }

        let host =
            url.host_str().ok_or_else(|| anyhow::anyhow!("mqtt url missing host"))?.to_string();
        let port = url.port().unwrap_or(1883);
        let query = |name: &str| {
            url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
        };
        let defaults = Self::default();

        Ok(Self {
            host,
            port,
            client_id: query("client_id").unwrap_or(defaults.client_id),
            topic_filter: query("topic").unwrap_or(defaults.topic_filter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_vars(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let c = from(&[]).unwrap();
        assert_eq!(c.bind.port(), 8080);
        assert_eq!(c.bus, BusKind::InMem);
        assert_eq!(c.storage, StorageKind::File);
        assert_eq!(c.devices_file, PathBuf::from("googleDevices.json"));
        assert_eq!(c.get(AGENT_USER_ID), None);
        assert_eq!(c.get_or_default(AGENT_USER_ID), "");
    }

    #[test]
    fn mqtt_url_then_overrides() {
        let c = from(&[
            ("HOMEGRAPH_BUS", "MQTT"),
            ("HOMEGRAPH_MQTT_URL", "mqtt://broker.lan:1884?client_id=bridge&topic=home/%23"),
            ("HOMEGRAPH_MQTT_PORT", "1999"),
        ])
        .unwrap();
        assert_eq!(c.bus, BusKind::Mqtt);
        assert_eq!(c.mqtt.host, "broker.lan");
        assert_eq!(c.mqtt.port, 1999);
        assert_eq!(c.mqtt.client_id, "bridge");
        assert_eq!(c.mqtt.topic_filter, "home/#");
    }

    #[test]
    fn agent_user_id_and_merge_policy() {
        let c = from(&[
            ("HOMEGRAPH_AGENT_USER_ID", "user-1"),
            ("HOMEGRAPH_ATTRIBUTE_MERGE", "strict"),
            ("HOMEGRAPH_STORAGE", "inmem"),
        ])
        .unwrap();
        assert_eq!(c.get(AGENT_USER_ID).as_deref(), Some("user-1"));
        assert_eq!(c.attribute_merge, AttributeMerge::Strict);
        assert_eq!(c.storage, StorageKind::InMem);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(from(&[("HOMEGRAPH_BUS", "carrier-pigeon")]).is_err());
        assert!(from(&[("HOMEGRAPH_MQTT_URL", "http://broker")]).is_err());
        assert!(from(&[("HOMEGRAPH_ATTRIBUTE_MERGE", "first-wins")]).is_err());
    }
}
