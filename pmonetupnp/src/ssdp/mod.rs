//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Ce module implémente la couche découverte d'UPnP :
//!
//! - [`Packet`] : codec du format texte SSDP (première ligne + en-têtes)
//! - [`Request`] / [`Response`] : vues typées sur un paquet
//! - [`MulticastServer`] / [`UnicastServer`] : une tâche de réception par interface
//! - [`MulticastServerList`] / [`UnicastServerList`] : déploiement sur toutes les interfaces
//!
//! ## Constantes SSDP
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Max-Age**: 1800 secondes

mod packet;
mod request;
mod response;
mod server;
mod server_list;
mod socket;

pub use packet::{Packet, PacketError};
pub use request::Request;
pub use response::Response;
pub use server::{MulticastListener, MulticastServer, UnicastListener, UnicastServer};
pub use server_list::{MulticastServerList, UnicastServerList};
pub use socket::{SsdpError, SsdpSocket};

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// TTL multicast par défaut
pub const MULTICAST_DEFAULT_TTL: u32 = 4;

/// Fenêtre `MX` par défaut des M-SEARCH (secondes)
pub const DEFAULT_MSEARCH_MX: u32 = 3;

/// Taille maximale d'un datagramme SSDP
pub const MAX_PACKET_SIZE: usize = 8192;

/// Durée de validité des annonces (en secondes)
pub const MAX_AGE: u32 = 1800;

pub const CRLF: &str = "\r\n";

/// Première ligne des M-SEARCH
pub const M_SEARCH: &str = "M-SEARCH";
pub const NOTIFY: &str = "NOTIFY";
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Jeton `MAN` de découverte (guillemets compris)
pub const DISCOVER: &str = "\"ssdp:discover\"";

pub const ROOT_DEVICE: &str = "upnp:rootdevice";
pub const ALL: &str = "ssdp:all";

pub const NTS_ALIVE: &str = "ssdp:alive";
pub const NTS_BYEBYE: &str = "ssdp:byebye";
pub const NTS_UPDATE: &str = "ssdp:update";
pub const NTS_PROPCHANGE: &str = "upnp:propchange";

/// Noms d'en-têtes SSDP (forme normalisée en majuscules)
pub mod header {
    pub const HOST: &str = "HOST";
    pub const MAN: &str = "MAN";
    pub const MX: &str = "MX";
    pub const ST: &str = "ST";
    pub const USN: &str = "USN";
    pub const NT: &str = "NT";
    pub const NTS: &str = "NTS";
    pub const LOCATION: &str = "LOCATION";
    pub const SERVER: &str = "SERVER";
    pub const USER_AGENT: &str = "USER-AGENT";
    pub const CACHE_CONTROL: &str = "CACHE-CONTROL";
    pub const EXT: &str = "EXT";
    pub const DATE: &str = "DATE";
    pub const BOOTID: &str = "BOOTID.UPNP.ORG";
    pub const SID: &str = "SID";
    pub const SEQ: &str = "SEQ";
    pub const CALLBACK: &str = "CALLBACK";
    pub const TIMEOUT: &str = "TIMEOUT";
}

/// `239.255.255.250:1900`
pub fn multicast_host() -> String {
    format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT)
}

/// Extrait `max-age=<n>` d'un en-tête CACHE-CONTROL, [`MAX_AGE`] par défaut.
pub fn parse_max_age(value: Option<&str>) -> u32 {
    let Some(v) = value else {
        return MAX_AGE;
    };

    let lower = v.to_ascii_lowercase();
    if let Some(idx) = lower.find("max-age") {
        let after_eq = lower[idx + 7..]
            .trim_start()
            .trim_start_matches('=')
            .trim_start();
        let digits: String = after_eq
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(age) = digits.parse::<u32>() {
            return age;
        }
    }
    tracing::trace!("Could not parse max-age from CACHE-CONTROL: '{}'", v);
    MAX_AGE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age(Some("max-age=120")), 120);
        assert_eq!(parse_max_age(Some("no-cache, MAX-AGE = 60")), 60);
        assert_eq!(parse_max_age(Some("garbage")), MAX_AGE);
        assert_eq!(parse_max_age(None), MAX_AGE);
    }

    #[test]
    fn test_multicast_host() {
        assert_eq!(multicast_host(), "239.255.255.250:1900");
    }
}
