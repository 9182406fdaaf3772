use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::{DUPLICATE_ID_MESSAGE, RepositoryError, ValidationErrors},
    model::Device,
    storage::{DeviceStore, InMemoryStore},
    validation::validate,
};

type Result<T> = std::result::Result<T, RepositoryError>;

/// Owner of the device catalog.
///
/// Reads hand out owned copies. Writes go through `add`/`update`/`delete` and become durable
/// only on `persist`. `create`, `edit` and `remove` run validation, mutation and persistence
/// under one write lock so concurrent edits cannot interleave.
pub struct DeviceRepository {
    store: Arc<dyn DeviceStore>,
    devices: RwLock<Vec<Device>>,
}

impl DeviceRepository {
    /// Loads the catalog from `store`.
    pub async fn load(store: Arc<dyn DeviceStore>) -> Result<Self> {
        let devices = store.load().await.map_err(RepositoryError::Storage)?;
        tracing::info!(devices = devices.len(), "device catalog loaded");
        Ok(Self { store, devices: RwLock::new(devices) })
    }

    pub fn in_memory() -> Self {
        Self { store: Arc::new(InMemoryStore::default()), devices: RwLock::new(Vec::new()) }
    }

    pub async fn get_all(&self) -> Vec<Device> {
        self.devices.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Result<Device> {
        let g = self.devices.read().await;
        g.iter().find(|d| d.id == id).cloned().ok_or_else(|| not_found(id))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.devices.read().await.iter().any(|d| d.id == id)
    }

    /// Inserts an already validated device.
    pub async fn add(&self, device: Device) -> Result<()> {
        let mut g = self.devices.write().await;
        insert(&mut g, device)
    }

    /// Replaces the device stored under `id`. The replacement may carry a new id as long as
    /// no other device already owns it.
    pub async fn update(&self, id: &str, device: Device) -> Result<()> {
        let mut g = self.devices.write().await;
        replace(&mut g, id, device)
    }

    pub async fn delete(&self, id: &str) -> Result<Device> {
        let mut g = self.devices.write().await;
        take(&mut g, id)
    }

    /// Writes the current catalog to the durable store.
    pub async fn persist(&self) -> Result<()> {
        let g = self.devices.write().await;
        self.save(&g).await
    }

    /// Validates, inserts and persists a new device. A duplicate id alone is a `Conflict`;
    /// together with validator errors it leads the `Invalid` list.
    pub async fn create(&self, device: Device) -> Result<()> {
        let mut g = self.devices.write().await;
        let mut errors = validate(&device);
        if g.iter().any(|d| d.id == device.id) {
            if errors.is_empty() {
                return Err(RepositoryError::Conflict(device.id));
            }
            errors.insert(0, DUPLICATE_ID_MESSAGE.to_string());
        }
        if !errors.is_empty() {
            return Err(RepositoryError::Invalid(ValidationErrors(errors)));
        }
        let id = device.id.clone();
        insert(&mut g, device)?;
        self.save(&g).await?;
        tracing::info!(device_id = %id, "device created");
        Ok(())
    }

    /// Applies `mutate` to a copy of the device, validates the result, commits it and persists.
    /// On validation failure the stored device is left untouched.
    pub async fn edit<F>(&self, id: &str, mutate: F) -> Result<Device>
    where
        F: FnOnce(&mut Device),
    {
        let mut g = self.devices.write().await;
        let mut device = g.iter().find(|d| d.id == id).cloned().ok_or_else(|| not_found(id))?;
        mutate(&mut device);
        check(&device)?;
        replace(&mut g, id, device.clone())?;
        self.save(&g).await?;
        tracing::info!(device_id = %device.id, "device updated");
        Ok(device)
    }

    /// Deletes and persists.
    pub async fn remove(&self, id: &str) -> Result<Device> {
        let mut g = self.devices.write().await;
        let removed = take(&mut g, id)?;
        self.save(&g).await?;
        tracing::info!(device_id = %id, "device deleted");
        Ok(removed)
    }

    async fn save(&self, devices: &[Device]) -> Result<()> {
        self.store.save(devices).await.map_err(|e| {
            tracing::error!(error = %e, "persisting device catalog failed");
            RepositoryError::Storage(e)
        })
    }
}

fn not_found(id: &str) -> RepositoryError {
    RepositoryError::NotFound(id.to_string())
}

fn check(device: &Device) -> Result<()> {
    let errors = validate(device);
    if errors.is_empty() { Ok(()) } else { Err(RepositoryError::Invalid(ValidationErrors(errors))) }
}

fn insert(devices: &mut Vec<Device>, device: Device) -> Result<()> {
    if devices.iter().any(|d| d.id == device.id) {
        return Err(RepositoryError::Conflict(device.id));
    }
    devices.push(device);
    Ok(())
}

fn replace(devices: &mut [Device], id: &str, device: Device) -> Result<()> {
    if device.id != id && devices.iter().any(|d| d.id == device.id) {
        return Err(RepositoryError::Conflict(device.id));
    }
    let slot = devices.iter_mut().find(|d| d.id == id).ok_or_else(|| not_found(id))?;
    *slot = device;
    Ok(())
}

fn take(devices: &mut Vec<Device>, id: &str) -> Result<Device> {
    let idx = devices.iter().position(|d| d.id == id).ok_or_else(|| not_found(id))?;
    Ok(devices.remove(idx))
}
