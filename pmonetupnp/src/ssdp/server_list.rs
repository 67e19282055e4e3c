//! Déploiement des serveurs SSDP sur toutes les interfaces utilisables.
//!
//! Un échec sur une interface n'empêche pas les autres de démarrer, mais
//! `start` retourne la dernière erreur rencontrée.

use std::sync::Arc;
use std::time::Duration;

use pmoutils::{NetInterface, available_interfaces};
use tracing::warn;

use super::{MulticastListener, MulticastServer, SsdpError, UnicastListener, UnicastServer};
use crate::logging::Logger;

fn usable_interfaces() -> Result<Vec<NetInterface>, SsdpError> {
    available_interfaces().map_err(SsdpError::NoInterface)
}

pub struct MulticastServerList {
    listener: Option<Arc<dyn MulticastListener>>,
    logger: Logger,
    ttl: u32,
    read_timeout: Duration,
    servers: Vec<MulticastServer>,
}

impl MulticastServerList {
    pub fn new(
        listener: Option<Arc<dyn MulticastListener>>,
        ttl: u32,
        read_timeout: Duration,
        logger: Logger,
    ) -> Self {
        Self {
            listener,
            logger,
            ttl,
            read_timeout,
            servers: Vec::new(),
        }
    }

    /// Démarre un serveur par interface utilisable.
    pub fn start(&mut self) -> Result<(), SsdpError> {
        let interfaces = usable_interfaces()?;
        self.start_on(&interfaces)
    }

    /// Démarre un serveur sur chacune des `interfaces` données.
    pub fn start_on(&mut self, interfaces: &[NetInterface]) -> Result<(), SsdpError> {
        self.stop()?;

        let mut last_err = None;
        for interface in interfaces {
            let mut server = MulticastServer::new(self.listener.clone(), self.logger.clone());
            match server.start(interface, self.ttl, self.read_timeout) {
                Ok(()) => self.servers.push(server),
                Err(e) => {
                    warn!("❌ SSDP multicast server failed on {}: {}", interface, e);
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn stop(&mut self) -> Result<(), SsdpError> {
        let mut last_err = None;
        for mut server in self.servers.drain(..) {
            if let Err(e) = server.stop() {
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

pub struct UnicastServerList {
    listener: Option<Arc<dyn UnicastListener>>,
    logger: Logger,
    ttl: u32,
    read_timeout: Duration,
    servers: Vec<UnicastServer>,
}

impl UnicastServerList {
    pub fn new(
        listener: Option<Arc<dyn UnicastListener>>,
        ttl: u32,
        read_timeout: Duration,
        logger: Logger,
    ) -> Self {
        Self {
            listener,
            logger,
            ttl,
            read_timeout,
            servers: Vec::new(),
        }
    }

    /// Démarre un serveur lié à `port` sur chaque interface utilisable.
    pub fn start(&mut self, port: u16) -> Result<(), SsdpError> {
        let interfaces = usable_interfaces()?;
        self.start_on(&interfaces, port)
    }

    pub fn start_on(&mut self, interfaces: &[NetInterface], port: u16) -> Result<(), SsdpError> {
        self.stop()?;

        let mut last_err = None;
        for interface in interfaces {
            let mut server = UnicastServer::new(self.listener.clone(), self.logger.clone());
            match server.start(interface, port, self.ttl, self.read_timeout) {
                Ok(()) => self.servers.push(server),
                Err(e) => {
                    warn!("❌ SSDP unicast server failed on {}: {}", interface, e);
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn stop(&mut self) -> Result<(), SsdpError> {
        let mut last_err = None;
        for mut server in self.servers.drain(..) {
            if let Err(e) = server.stop() {
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Envoie un M-SEARCH depuis chaque interface démarrée.
    pub fn search(&self, st: &str, mx: u32) -> Result<(), SsdpError> {
        if self.servers.is_empty() {
            return Err(SsdpError::Closed);
        }

        let mut last_err = None;
        for server in &self.servers {
            if let Err(e) = server.search(st, mx) {
                warn!("❌ Failed to send M-SEARCH: {}", e);
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn servers(&self) -> &[UnicastServer] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_unicast_list_keeps_started_servers_and_reports_last_error() {
        let good = NetInterface::new("lo", Ipv4Addr::LOCALHOST);
        // Adresse de documentation jamais portée par l'hôte
        let bad = NetInterface::new("bogus", Ipv4Addr::new(192, 0, 2, 123));

        let mut list = UnicastServerList::new(None, 4, Duration::from_millis(20), Logger::none());
        let result = list.start_on(&[good, bad], 0);
        assert!(matches!(result, Err(SsdpError::Bind { .. })));
        assert_eq!(list.len(), 1);

        list.stop().unwrap();
        assert!(list.is_empty());
        assert!(matches!(list.search("ssdp:all", 1), Err(SsdpError::Closed)));
    }
}
