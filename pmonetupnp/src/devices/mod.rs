//! Module pour les devices UPnP.
//!
//! Un [`Device`] est l'arbre de description d'un device UPnP : ses
//! informations descriptives, ses services et ses devices embarqués.
//! Il est construit depuis une description XML (texte, URL ou message
//! SSDP) ou programmatiquement pour être servi par un
//! [`DeviceServer`](crate::DeviceServer).
//!
//! # Liens de parenté
//!
//! Les services et devices embarqués ne pointent pas vers leur parent :
//! ils portent un [`DeviceLink`], instantané immuable partagé (`Arc`)
//! de l'identité du parent et du contexte d'URL de la racine. Toute
//! modification d'un champ concerné reconstruit les liens de la
//! descendance, si bien qu'un arbre n'est jamais partiellement lié.
//!
//! # Exemple
//!
//! ```
//! use pmonetupnp::devices::Device;
//! use pmonetupnp::services::Service;
//!
//! let device = Device::new("urn:schemas-upnp-org:device:BinaryLight:1", "Light")
//!     .with_service(Service::new(
//!         "urn:schemas-upnp-org:service:SwitchPower:1",
//!         "urn:upnp-org:serviceId:SwitchPower.0001",
//!     ));
//!
//! let service = &device.services()[0];
//! assert_eq!(service.device().unwrap().device_type, device.device_type());
//! ```

mod device_methods;
mod device_registry;
pub mod errors;

use std::sync::Arc;

use xmltree::Element;

pub use device_registry::DeviceMap;
pub use errors::DescriptionError;

use crate::services::Service;
use crate::xml::{child_text, push_text};

/// Chemin de description servi par défaut.
pub const DEFAULT_DESCRIPTION_URL: &str = "/description.xml";

pub const DEVICE_NAMESPACE: &str = "urn:schemas-upnp-org:device-1-0";

/// Protocole des URLs de localisation annoncées.
pub const DEVICE_PROTOCOL: &str = "http";

/// Version `specVersion` d'une description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecVersion {
    pub major: u32,
    pub minor: u32,
}

impl SpecVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub(crate) fn from_xml_element(elem: &Element) -> Self {
        let default = Self::default();
        Self {
            major: child_text(elem, "major").parse().unwrap_or(default.major),
            minor: child_text(elem, "minor").parse().unwrap_or(default.minor),
        }
    }

    pub(crate) fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("specVersion");
        push_text(&mut elem, "major", &self.major.to_string());
        push_text(&mut elem, "minor", &self.minor.to_string());
        elem
    }
}

impl Default for SpecVersion {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icon {
    pub mimetype: String,
    pub width: String,
    pub height: String,
    pub depth: String,
    pub url: String,
}

/// Champs descriptifs d'un device, sans effet sur les liens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub friendly_name: String,
    pub manufacturer: String,
    pub manufacturer_url: String,
    pub model_description: String,
    pub model_name: String,
    pub model_number: String,
    pub model_url: String,
    pub serial_number: String,
    pub upc: String,
    pub presentation_url: String,
}

/// Vue d'un device depuis ses services et ses devices embarqués.
///
/// `url_base` et `location_url` sont toujours ceux du device racine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLink {
    pub device_type: String,
    pub udn: String,
    pub parent_udn: Option<String>,
    pub url_base: String,
    pub location_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Device {
    device_type: String,
    udn: String,
    pub info: DeviceInfo,
    pub icons: Vec<Icon>,
    services: Vec<Service>,
    devices: Vec<Device>,
    spec_version: SpecVersion,
    url_base: String,
    location_url: String,
    description_url: String,
    parent: Option<Arc<DeviceLink>>,
}
