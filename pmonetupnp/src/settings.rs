//! Paramètres du moteur UPnP.
//!
//! [`UpnpSettings`] est un instantané typé de la configuration `pmoconfig`
//! consommé par le point de contrôle et le serveur de device.

use std::time::Duration;

use pmoconfig::Config;
use rand::Rng;

/// Fenêtre de ports `[base, base + range)` dans laquelle un port est tiré
/// au hasard quand l'appelant n'en fournit pas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub base: u16,
    pub range: u16,
}

impl PortRange {
    pub const fn new(base: u16, range: u16) -> Self {
        Self { base, range }
    }

    /// Tire un port dans la fenêtre.
    pub fn pick(&self) -> u16 {
        if self.range == 0 {
            return self.base;
        }
        let offset = rand::rng().random_range(0..self.range);
        self.base.saturating_add(offset)
    }
}

#[derive(Debug, Clone)]
pub struct UpnpSettings {
    /// Fenêtre de recherche `MX` (secondes)
    pub search_mx: u32,
    pub multicast_ttl: u32,
    /// Intervalle de scrutation des sockets, borne le délai d'arrêt
    pub read_timeout: Duration,
    pub control_point_ports: PortRange,
    pub device_ports: PortRange,
    pub http_timeout: Duration,
    pub product_name: String,
    pub product_version: String,
}

impl Default for UpnpSettings {
    fn default() -> Self {
        Self {
            search_mx: pmoconfig::DEFAULT_SEARCH_MX as u32,
            multicast_ttl: pmoconfig::DEFAULT_MULTICAST_TTL as u32,
            read_timeout: Duration::from_millis(pmoconfig::DEFAULT_READ_TIMEOUT_MS),
            control_point_ports: PortRange::new(
                pmoconfig::DEFAULT_CONTROL_POINT_PORT_BASE as u16,
                pmoconfig::DEFAULT_CONTROL_POINT_PORT_RANGE as u16,
            ),
            device_ports: PortRange::new(
                pmoconfig::DEFAULT_DEVICE_PORT_BASE as u16,
                pmoconfig::DEFAULT_DEVICE_PORT_RANGE as u16,
            ),
            http_timeout: Duration::from_secs(pmoconfig::DEFAULT_HTTP_TIMEOUT_SECS),
            product_name: pmoconfig::DEFAULT_PRODUCT_NAME.to_string(),
            product_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn clamp_u16(value: u64) -> u16 {
    value.min(u16::MAX as u64) as u16
}

fn clamp_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}

impl UpnpSettings {
    /// Construit les paramètres à partir d'une configuration chargée.
    pub fn from_config(config: &Config) -> Self {
        Self {
            search_mx: clamp_u32(config.get_search_mx()),
            multicast_ttl: clamp_u32(config.get_multicast_ttl()),
            read_timeout: Duration::from_millis(config.get_read_timeout_ms().max(1)),
            control_point_ports: PortRange::new(
                clamp_u16(config.get_control_point_port_base()),
                clamp_u16(config.get_control_point_port_range()),
            ),
            device_ports: PortRange::new(
                clamp_u16(config.get_device_port_base()),
                clamp_u16(config.get_device_port_range()),
            ),
            http_timeout: Duration::from_secs(config.get_http_timeout_secs()),
            product_name: config.get_product_name(),
            product_version: config.get_product_version(),
        }
    }

    /// Charge `config.yaml` depuis `directory` (voir [`Config::load`]).
    pub fn load(directory: &str) -> anyhow::Result<Self> {
        let config = Config::load(directory)?;
        Ok(Self::from_config(&config))
    }

    /// Chaîne `SERVER` / `USER-AGENT` annoncée par le moteur.
    pub fn user_agent(&self) -> String {
        pmoutils::user_agent(&self.product_name, &self.product_version)
    }
}
