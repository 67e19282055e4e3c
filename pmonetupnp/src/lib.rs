//! # pmonetupnp - moteur UPnP
//!
//! Implémentation des deux rôles UPnP au-dessus de SSDP, HTTP et SOAP :
//!
//! - [`ControlPoint`] : découvre les devices (M-SEARCH, NOTIFY), charge leurs
//!   descriptions et les range dans un [`DeviceMap`] ;
//! - [`DeviceServer`] : publie un [`Device`], répond aux recherches et sert
//!   description, SCPD et contrôle SOAP.
//!
//! Le modèle de description ([`Device`], [`Service`], [`Action`],
//! [`Argument`]) est commun aux deux rôles. Les références vers les objets
//! parents sont des instantanés immuables recalculés à chaque mutation.
//!
//! ## Journalisation
//!
//! Les composants reçoivent un [`Logger`] ; le logger par défaut est muet.
//!
//! ```no_run
//! use pmonetupnp::{ControlPoint, Logger, UpnpSettings};
//!
//! let cp = ControlPoint::new(UpnpSettings::default(), Logger::stderr("pmonetupnp=debug"));
//! ```

pub mod actions;
pub mod control_point;
pub mod device_server;
pub mod devices;
pub mod http_client;
pub mod logging;
pub mod services;
pub mod settings;
pub mod soap;
pub mod ssdp;
pub mod state_variables;

mod xml;

pub use actions::{Action, ActionError, Argument, Direction};
pub use control_point::{ControlPoint, ControlPointError, ControlPointListener};
pub use device_server::{ActionListener, DeviceError, DeviceServer, HttpListener, HttpRequest};
pub use devices::{DescriptionError, Device, DeviceMap};
pub use http_client::{HttpClient, HttpError};
pub use logging::Logger;
pub use services::Service;
pub use settings::{PortRange, UpnpSettings};
pub use soap::UpnpError;
