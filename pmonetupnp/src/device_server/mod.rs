//! Rôle serveur : publication d'un device UPnP.
//!
//! Un [`DeviceServer`] possède l'arbre de description d'un device racine,
//! répond aux M-SEARCH qui le concernent et sert en HTTP la description,
//! les SCPD et le contrôle SOAP des actions. Chaque action reçue est
//! confiée à l'[`ActionListener`] de l'application.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pmonetupnp::{Action, ActionListener, Device, DeviceServer, UpnpError};
//!
//! struct Light;
//!
//! impl ActionListener for Light {
//!     fn action_request_received(&self, action: &mut Action) -> Result<(), UpnpError> {
//!         match action.name() {
//!             "GetStatus" => action
//!                 .set_argument_bool("ResultStatus", true)
//!                 .map_err(|_| UpnpError::from_code(pmonetupnp::soap::codes::ACTION_FAILED)),
//!             _ => Err(UpnpError::from_code(pmonetupnp::soap::codes::OPTIONAL_ACTION_NOT_IMPLEMENTED)),
//!         }
//!     }
//! }
//!
//! let device = Device::new("urn:schemas-upnp-org:device:BinaryLight:1", "Light");
//! let mut server = DeviceServer::new(device).with_action_listener(Arc::new(Light));
//! server.start()?;
//! # Ok::<(), pmonetupnp::DeviceError>(())
//! ```

mod http;
mod responder;

use std::io;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use axum::response::Response as HttpResponse;
use pmoutils::{NetInterface, available_interfaces};
use thiserror::Error;
use tracing::info;

use crate::actions::Action;
use crate::devices::{DescriptionError, Device};
use crate::logging::Logger;
use crate::settings::UpnpSettings;
use crate::soap::UpnpError;
use crate::ssdp::{MulticastListener, MulticastServerList, SsdpError};

use http::HttpServer;
use responder::Responder;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Ssdp(#[from] SsdpError),

    #[error(transparent)]
    Description(#[from] DescriptionError),

    #[error("HTTP server error: {0}")]
    Http(#[from] io::Error),

    #[error("HTTP server thread panicked")]
    ThreadPanicked,
}

/// Traitement applicatif des actions reçues.
///
/// Les arguments `in` sont déjà renseignés ; l'implémentation remplit
/// les arguments `out` ou rejette l'action par un [`UpnpError`].
pub trait ActionListener: Send + Sync {
    fn action_request_received(&self, action: &mut Action) -> Result<(), UpnpError>;
}

/// Requête HTTP non reconnue par le device.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Point d'extension pour les requêtes HTTP que le device ne traite pas.
pub trait HttpListener: Send + Sync {
    fn http_request_received(&self, request: &HttpRequest) -> HttpResponse;
}

pub struct DeviceServer {
    device: Arc<Device>,
    settings: UpnpSettings,
    logger: Logger,
    action_listener: Option<Arc<dyn ActionListener>>,
    http_listener: Option<Arc<dyn HttpListener>>,
    ssdp_listener: Option<Arc<dyn MulticastListener>>,
    port: Option<u16>,
    multicast: Option<MulticastServerList>,
    http: Option<HttpServer>,
}

impl DeviceServer {
    pub fn new(device: Device) -> Self {
        Self::with_settings(device, UpnpSettings::default(), Logger::default())
    }

    pub fn with_settings(device: Device, settings: UpnpSettings, logger: Logger) -> Self {
        Self {
            device: Arc::new(device),
            settings,
            logger,
            action_listener: None,
            http_listener: None,
            ssdp_listener: None,
            port: None,
            multicast: None,
            http: None,
        }
    }

    pub fn with_action_listener(mut self, listener: Arc<dyn ActionListener>) -> Self {
        self.action_listener = Some(listener);
        self
    }

    pub fn with_http_listener(mut self, listener: Arc<dyn HttpListener>) -> Self {
        self.http_listener = Some(listener);
        self
    }

    /// Listener recevant les NOTIFY et M-SEARCH après traitement interne.
    pub fn with_ssdp_listener(mut self, listener: Arc<dyn MulticastListener>) -> Self {
        self.ssdp_listener = Some(listener);
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Port HTTP effectif, `None` si le serveur est arrêté.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_running(&self) -> bool {
        self.http.is_some()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Démarre sur un port tiré dans la fenêtre configurée.
    pub fn start(&mut self) -> Result<(), DeviceError> {
        let port = self.settings.device_ports.pick();
        self.start_with_port(port)
    }

    pub fn start_with_port(&mut self, port: u16) -> Result<(), DeviceError> {
        let interfaces = available_interfaces().map_err(SsdpError::NoInterface)?;
        self.start_on(&interfaces, port)
    }

    /// Démarre le serveur HTTP sur `port` (0 : port éphémère) puis un
    /// serveur multicast par interface de `interfaces`.
    ///
    /// La description est révisée avant publication. En cas d'échec, ce
    /// qui a déjà démarré est arrêté.
    pub fn start_on(&mut self, interfaces: &[NetInterface], port: u16) -> Result<(), DeviceError> {
        let logger = self.logger.clone();
        logger.scope(|| -> Result<(), DeviceError> {
            self.stop()?;

            Arc::make_mut(&mut self.device).revise_description();

            let http = HttpServer::bind(port)?;
            let port = http.port();

            let responder = Arc::new(Responder::new(
                Arc::clone(&self.device),
                &self.settings,
                self.logger.clone(),
                port,
                interfaces.to_vec(),
                self.action_listener.clone(),
                self.http_listener.clone(),
                self.ssdp_listener.clone(),
            ));

            let http = http.serve(Arc::clone(&responder), self.logger.clone())?;

            let multicast_listener: Arc<dyn MulticastListener> = responder;
            let mut multicast = MulticastServerList::new(
                Some(multicast_listener),
                self.settings.multicast_ttl,
                self.settings.read_timeout,
                self.logger.clone(),
            );
            if let Err(err) = multicast.start_on(interfaces) {
                let _ = multicast.stop();
                let mut http = http;
                let _ = http.stop();
                return Err(err.into());
            }

            info!(
                "✅ Device {} ({}) started on port {}",
                self.device.friendly_name(),
                self.device.udn(),
                port
            );
            self.http = Some(http);
            self.multicast = Some(multicast);
            self.port = Some(port);
            Ok(())
        })
    }

    /// Arrête les serveurs ; sans effet si le device est arrêté.
    pub fn stop(&mut self) -> Result<(), DeviceError> {
        let mut last_err = None;

        if let Some(mut multicast) = self.multicast.take() {
            if let Err(err) = multicast.stop() {
                last_err = Some(DeviceError::from(err));
            }
        }
        if let Some(mut http) = self.http.take() {
            if let Err(err) = http.stop() {
                last_err = Some(err);
            }
        }
        self.port = None;

        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for DeviceServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
