use std::collections::HashSet;

use crate::model::Device;

/// Checks the structural rules a device must satisfy before it is stored.
///
/// Every rule is evaluated; an empty result means the device is acceptable.
pub fn validate(device: &Device) -> Vec<String> {
    let mut errors = Vec::new();

    if device.id.trim().is_empty() {
        errors.push("Device Id is required".to_string());
    }

    if device.name.name.trim().is_empty() {
        errors.push("Device name is required".to_string());
    }

    if !device.device_type.is_recognized() {
        errors.push(format!("Device type '{}' is not recognized", device.device_type));
    }

    let mut seen = HashSet::new();
    for device_trait in &device.traits {
        if !device_trait.kind.is_recognized() {
            errors.push(format!("Trait '{}' is not recognized", device_trait.kind));
        }
        if !seen.insert(&device_trait.kind) {
            errors.push(format!("Trait '{}' is declared more than once", device_trait.kind.name()));
        }
    }

    if device.device_info.as_ref().is_some_and(|info| info.is_empty()) {
        errors.push("Device info must carry at least one value".to_string());
    }

    errors
}
