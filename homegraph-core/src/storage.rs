use crate::model::Device;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;

/// Durable backing for the device catalog. `save` followed by `load` must reproduce the same
/// devices in the same order.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Device>>;
    async fn save(&self, devices: &[Device]) -> Result<()>;
}

/// Stores the catalog as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl DeviceStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Device>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.path.display(),
                    "device catalog missing, starting empty"
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let catalog: Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse device catalog {}", self.path.display()))?;
        parse_catalog(catalog).with_context(|| format!("read devices from {}", self.path.display()))
    }

    async fn save(&self, devices: &[Device]) -> Result<()> {
        let json = serde_json::to_vec_pretty(devices).context("serialize device catalog")?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json).await.with_context(|| format!("write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;

        tracing::debug!(
            path = %self.path.display(),
            devices = devices.len(),
            "device catalog saved"
        );
        Ok(())
    }
}

/// Accepts the array layout written by `save` and the older object keyed by device id.
/// Both keep the order found in the file.
fn parse_catalog(catalog: Value) -> Result<Vec<Device>> {
    match catalog {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                serde_json::from_value(item).with_context(|| format!("device at index {idx}"))
            })
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| {
                serde_json::from_value(item).with_context(|| format!("device under key '{key}'"))
            })
            .collect(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            bail!("device catalog must be an array or an object")
        }
    }
}

/// Keeps the last saved snapshot in memory.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    saved: Arc<Mutex<Vec<Device>>>,
}

impl InMemoryStore {
    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self { saved: Arc::new(Mutex::new(devices)) }
    }
}

#[async_trait]
impl DeviceStore for InMemoryStore {
    async fn load(&self) -> Result<Vec<Device>> {
        Ok(self.saved.lock().await.clone())
    }

    async fn save(&self, devices: &[Device]) -> Result<()> {
        *self.saved.lock().await = devices.to_vec();
        Ok(())
    }
}
