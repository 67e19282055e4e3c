//! Point de contrôle UPnP.
//!
//! Le [`ControlPoint`] écoute les annonces multicast, émet des M-SEARCH
//! et enregistre chaque device racine découvert (description et SCPD
//! compris) dans un registre interrogeable.
//!
//! La recherche est sans attente : après [`ControlPoint::search_root_device`],
//! l'appelant laisse s'écouler la fenêtre `MX` avant de lire le registre.
//!
//! ```no_run
//! use std::time::Duration;
//! use pmonetupnp::ControlPoint;
//!
//! let mut cp = ControlPoint::default();
//! cp.start()?;
//! cp.search_root_device()?;
//! std::thread::sleep(Duration::from_secs(cp.search_mx() as u64));
//! for device in cp.root_devices() {
//!     println!("{} ({})", device.friendly_name(), device.udn());
//! }
//! cp.stop()?;
//! # Ok::<(), pmonetupnp::ControlPointError>(())
//! ```

mod discovery;

use std::sync::Arc;

use pmoutils::{NetInterface, available_interfaces};
use thiserror::Error;
use tracing::info;

use crate::devices::{DescriptionError, Device};
use crate::http_client::HttpClient;
use crate::logging::Logger;
use crate::settings::UpnpSettings;
use crate::ssdp::{
    MulticastListener, MulticastServerList, ROOT_DEVICE, Request, Response, SsdpError,
    UnicastListener, UnicastServerList,
};

use discovery::Discovery;

#[derive(Debug, Error)]
pub enum ControlPointError {
    #[error(transparent)]
    Ssdp(#[from] SsdpError),

    #[error(transparent)]
    Description(#[from] DescriptionError),

    #[error("control point is not started")]
    NotStarted,
}

/// Évènements SSDP transmis à l'application, après traitement interne.
pub trait ControlPointListener: Send + Sync {
    fn device_notify_received(&self, _request: &Request) {}
    fn device_search_received(&self, _request: &Request) {}
    fn device_response_received(&self, _response: &Response) {}
}

pub struct ControlPoint {
    settings: UpnpSettings,
    logger: Logger,
    search_mx: u32,
    port: Option<u16>,
    discovery: Arc<Discovery>,
    multicast: Option<MulticastServerList>,
    unicast: Option<UnicastServerList>,
}

impl Default for ControlPoint {
    fn default() -> Self {
        Self::new(UpnpSettings::default(), Logger::default())
    }
}

impl ControlPoint {
    pub fn new(settings: UpnpSettings, logger: Logger) -> Self {
        let discovery = Arc::new(Discovery::new(HttpClient::from_settings(&settings)));
        Self {
            search_mx: settings.search_mx,
            settings,
            logger,
            port: None,
            discovery,
            multicast: None,
            unicast: None,
        }
    }

    pub fn with_listener(self, listener: Arc<dyn ControlPointListener>) -> Self {
        self.set_listener(Some(listener));
        self
    }

    pub fn set_listener(&self, listener: Option<Arc<dyn ControlPointListener>>) {
        self.discovery.set_listener(listener);
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Port unicast demandé au démarrage.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Client HTTP utilisé pour les descriptions, à passer à
    /// [`Action::post_with`](crate::Action::post_with) pour invoquer les
    /// actions avec les mêmes réglages.
    pub fn http_client(&self) -> &HttpClient {
        self.discovery.client()
    }

    pub fn search_mx(&self) -> u32 {
        self.search_mx
    }

    pub fn set_search_mx(&mut self, mx: u32) {
        self.search_mx = mx;
    }

    pub fn is_running(&self) -> bool {
        self.unicast.is_some()
    }

    /// Démarre sur un port tiré dans la fenêtre configurée.
    pub fn start(&mut self) -> Result<(), ControlPointError> {
        let port = self.settings.control_point_ports.pick();
        self.start_with_port(port)
    }

    pub fn start_with_port(&mut self, port: u16) -> Result<(), ControlPointError> {
        let interfaces = available_interfaces().map_err(SsdpError::NoInterface)?;
        self.start_on(&interfaces, port)
    }

    /// Démarre les serveurs multicast puis unicast sur `interfaces`.
    ///
    /// En cas d'échec, tout ce qui a déjà démarré est arrêté.
    pub fn start_on(
        &mut self,
        interfaces: &[NetInterface],
        port: u16,
    ) -> Result<(), ControlPointError> {
        let logger = self.logger.clone();
        logger.scope(|| -> Result<(), ControlPointError> {
            self.stop()?;

            let multicast_listener: Arc<dyn MulticastListener> = self.discovery.clone();
            let mut multicast = MulticastServerList::new(
                Some(multicast_listener),
                self.settings.multicast_ttl,
                self.settings.read_timeout,
                self.logger.clone(),
            );
            if let Err(err) = multicast.start_on(interfaces) {
                let _ = multicast.stop();
                return Err(err.into());
            }

            let unicast_listener: Arc<dyn UnicastListener> = self.discovery.clone();
            let mut unicast = UnicastServerList::new(
                Some(unicast_listener),
                self.settings.multicast_ttl,
                self.settings.read_timeout,
                self.logger.clone(),
            );
            if let Err(err) = unicast.start_on(interfaces, port) {
                let _ = unicast.stop();
                let _ = multicast.stop();
                return Err(err.into());
            }

            self.multicast = Some(multicast);
            self.unicast = Some(unicast);
            self.port = Some(port);
            info!(
                "✅ Control point started on port {} ({} interface(s))",
                port,
                interfaces.len()
            );
            Ok(())
        })
    }

    /// Arrête les serveurs ; sans effet si le point de contrôle est arrêté.
    pub fn stop(&mut self) -> Result<(), ControlPointError> {
        let mut last_err = None;

        if let Some(mut multicast) = self.multicast.take() {
            if let Err(err) = multicast.stop() {
                last_err = Some(err);
            }
        }
        if let Some(mut unicast) = self.unicast.take() {
            if let Err(err) = unicast.stop() {
                last_err = Some(err);
            }
        }

        match last_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Émet un M-SEARCH pour `st` sur chaque interface démarrée.
    pub fn search(&self, st: &str) -> Result<(), ControlPointError> {
        let unicast = self.unicast.as_ref().ok_or(ControlPointError::NotStarted)?;
        self.logger
            .scope(|| unicast.search(st, self.search_mx))
            .map_err(Into::into)
    }

    pub fn search_root_device(&self) -> Result<(), ControlPointError> {
        self.search(ROOT_DEVICE)
    }

    /// Charge et enregistre le device décrit à `location`.
    ///
    /// Retourne `false` si le device était déjà enregistré.
    pub fn add_device_from_location(&self, location: &str) -> Result<bool, ControlPointError> {
        self.logger
            .scope(|| self.discovery.register(location))
            .map_err(Into::into)
    }

    pub fn root_devices(&self) -> Vec<Arc<Device>> {
        self.discovery.registry().devices()
    }

    pub fn root_devices_by_type(&self, device_type: &str) -> Vec<Arc<Device>> {
        self.discovery.registry().devices_by_type(device_type)
    }

    pub fn find_device_by_type_and_udn(&self, device_type: &str, udn: &str) -> Option<Arc<Device>> {
        self.discovery.registry().find_device(device_type, udn)
    }
}

impl Drop for ControlPoint {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        notify: AtomicUsize,
        search: AtomicUsize,
        response: AtomicUsize,
    }

    impl ControlPointListener for Counter {
        fn device_notify_received(&self, _request: &Request) {
            self.notify.fetch_add(1, Ordering::SeqCst);
        }
        fn device_search_received(&self, _request: &Request) {
            self.search.fetch_add(1, Ordering::SeqCst);
        }
        fn device_response_received(&self, _response: &Response) {
            self.response.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_new_control_point_is_empty() {
        let cp = ControlPoint::default();
        assert!(cp.root_devices().is_empty());
        assert!(cp.root_devices_by_type("urn:any").is_empty());
        assert!(cp.find_device_by_type_and_udn("urn:any", "uuid:x").is_none());
        assert!(!cp.is_running());
        assert_eq!(cp.search_mx(), UpnpSettings::default().search_mx);
    }

    #[test]
    fn test_search_requires_start() {
        let cp = ControlPoint::default();
        assert!(matches!(
            cp.search_root_device(),
            Err(ControlPointError::NotStarted)
        ));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut cp = ControlPoint::default();
        cp.stop().unwrap();
        cp.start_on(&[], 0).unwrap();
        assert!(cp.is_running());
        assert_eq!(cp.port(), Some(0));
        cp.stop().unwrap();
        cp.stop().unwrap();
        assert!(!cp.is_running());
    }

    #[test]
    fn test_events_are_forwarded_to_listener() {
        let counter = Arc::new(Counter::default());
        let cp = ControlPoint::default().with_listener(counter.clone());

        let byebye = Request::parse(
            b"NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\nNTS: ssdp:byebye\r\nUSN: uuid:x::upnp:rootdevice\r\n\r\n",
        )
        .unwrap();
        let search = Request::new_search(ROOT_DEVICE, 1);
        let response = Response::parse(b"HTTP/1.1 200 OK\r\nST: upnp:rootdevice\r\n\r\n").unwrap();

        cp.discovery.device_notify_received(&byebye);
        cp.discovery.device_search_received(&search);
        cp.discovery.device_response_received(&response);

        assert_eq!(counter.notify.load(Ordering::SeqCst), 1);
        assert_eq!(counter.search.load(Ordering::SeqCst), 1);
        assert_eq!(counter.response.load(Ordering::SeqCst), 1);
        assert!(cp.root_devices().is_empty());
    }

    #[test]
    fn test_unreachable_location_is_not_registered() {
        let cp = ControlPoint::default();
        assert!(cp
            .add_device_from_location("http://127.0.0.1:9/description.xml")
            .is_err());
        assert!(cp.root_devices().is_empty());
    }
}
