//! Utilitaires réseau partagés par le moteur UPnP.
//!
//! # Fonctions principales
//!
//! - [`available_interfaces`] : interfaces utilisables pour SSDP
//! - [`interface_for_addr`] : interface de réponse la plus proche d'un pair
//! - [`absolute_url`] : résolution des URLs de description et de contrôle
//! - [`user_agent`] : chaîne `SERVER` / `USER-AGENT` UPnP
//!
//! # Examples
//!
//! ```
//! use pmoutils::user_agent;
//!
//! let ua = user_agent("pmonetupnp", "0.1.0");
//! assert!(ua.contains(" UPnP/1.1 pmonetupnp/0.1.0"));
//! ```
mod ip_utils;
mod url_utils;

pub use ip_utils::{
    NetInterface, available_interfaces, interface_for_addr, is_ipv6_address,
    match_address_block_count, select_interface_for_addr,
};
pub use url_utils::{UrlError, absolute_url, url_origin};

/// Version UPnP annoncée dans les en-têtes `SERVER`.
pub const UPNP_VERSION: &str = "1.1";

/// Préfixe des UDN.
pub const UUID_PREFIX: &str = "uuid:";

/// Retourne une chaîne décrivant le système d'exploitation et sa version.
///
/// Utilise la crate `os_info` pour obtenir de manière portable
/// les informations sur le système d'exploitation courant.
///
/// # Format
/// - macOS: "macOS/15.1" ou "Mac OS/10.15.7"
/// - Linux: "Linux/6.5.0" ou "Ubuntu/22.04"
/// - Autre: "{OS}/Unknown"
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}

/// Construit la chaîne `USER-AGENT` / `SERVER` UPnP.
///
/// Format : `"{os}/{version} UPnP/1.1 {product}/{product_version}"`.
pub fn user_agent(product: &str, product_version: &str) -> String {
    format!(
        "{} UPnP/{} {}/{}",
        get_os_string(),
        UPNP_VERSION,
        product,
        product_version
    )
}

/// Génère un UUID v4 aléatoire.
pub fn create_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Construit un UDN (`uuid:...`) à partir d'un UUID brut.
pub fn udn_from_uuid(uuid: &str) -> String {
    format!("{}{}", UUID_PREFIX, uuid)
}
