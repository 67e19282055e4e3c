//! Registre des devices découverts.
//!
//! Les devices sont indexés par type puis par UDN. L'insertion est
//! idempotente : le couple (type, UDN) est l'identité d'une entrée, et
//! aucune entrée n'est jamais retirée.

use std::collections::HashMap;
use std::sync::Arc;

use super::Device;

#[derive(Debug, Clone, Default)]
pub struct DeviceMap {
    devices: HashMap<String, HashMap<String, Arc<Device>>>,
}

impl DeviceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un device.
    ///
    /// Retourne `false` si un device de même type et de même UDN est déjà
    /// présent (le registre est alors inchangé) ou si le type ou l'UDN
    /// est vide.
    pub fn add(&mut self, device: impl Into<Arc<Device>>) -> bool {
        let device = device.into();
        if device.device_type().is_empty() || device.udn().is_empty() {
            return false;
        }

        let by_udn = self
            .devices
            .entry(device.device_type().to_string())
            .or_default();
        if by_udn.contains_key(device.udn()) {
            return false;
        }

        by_udn.insert(device.udn().to_string(), device);
        true
    }

    pub fn find_device(&self, device_type: &str, udn: &str) -> Option<Arc<Device>> {
        self.devices.get(device_type)?.get(udn).cloned()
    }

    pub fn has_device(&self, device_type: &str, udn: &str) -> bool {
        self.devices
            .get(device_type)
            .is_some_and(|by_udn| by_udn.contains_key(udn))
    }

    pub fn contains(&self, device: &Device) -> bool {
        self.has_device(device.device_type(), device.udn())
    }

    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.devices
            .values()
            .flat_map(|by_udn| by_udn.values().cloned())
            .collect()
    }

    pub fn devices_by_type(&self, device_type: &str) -> Vec<Arc<Device>> {
        self.devices
            .get(device_type)
            .map(|by_udn| by_udn.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.devices.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
