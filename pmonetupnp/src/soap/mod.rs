//! # Module SOAP - contrôle des actions UPnP
//!
//! Encodage des requêtes, réponses et faults d'action, et décodage
//! générique des enveloppes dont les noms d'arguments ne sont connus qu'à
//! l'exécution.
//!
//! ## Example
//!
//! ```
//! use pmonetupnp::soap::{build_soap_request, parse_soap_action};
//!
//! let args = vec![("newTargetValue".to_string(), "1".to_string())];
//! let xml = build_soap_request("urn:schemas-upnp-org:service:SwitchPower:1", "SetTarget", &args)?;
//!
//! let action = parse_soap_action(xml.as_bytes())?;
//! assert_eq!(action.name, "SetTarget");
//! assert_eq!(action.argument("newTargetValue"), Some("1"));
//! # Ok::<(), pmonetupnp::soap::SoapError>(())
//! ```

mod builder;
mod parser;
mod upnp_error;

pub use builder::{build_soap_fault, build_soap_request, build_soap_response};
pub use parser::{
    SoapAction, extract_body, parse_soap_action, parse_soap_fault, parse_soap_response,
};
pub use upnp_error::{UpnpError, codes, error_code_description};

use thiserror::Error;

pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const UPNP_CONTROL_NS: &str = "urn:schemas-upnp-org:control-1-0";

/// Suffixe des éléments de réponse d'action
pub const RESPONSE_SUFFIX: &str = "Response";

#[derive(Debug, Error)]
pub enum SoapError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML write error: {0}")]
    Emit(#[from] xmltree::Error),

    #[error("SOAP message is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,

    #[error("No action found in SOAP Body")]
    NoAction,

    #[error("SOAP Body is not a Fault")]
    NotAFault,

    #[error("invalid UPnP error code '{0}'")]
    InvalidErrorCode(String),
}
