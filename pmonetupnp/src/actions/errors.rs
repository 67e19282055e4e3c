//! Erreurs relatives aux actions UPnP.

use std::num::{ParseFloatError, ParseIntError};

use pmoutils::UrlError;
use thiserror::Error;

use crate::devices::DescriptionError;
use crate::http_client::HttpError;
use crate::soap::{SoapError, UpnpError};

/// Échec de coercition d'une valeur textuelle d'argument.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentValueError {
    #[error("invalid integer value: {0}")]
    Int(#[from] ParseIntError),

    #[error("invalid float value: {0}")]
    Float(#[from] ParseFloatError),

    #[error("invalid boolean value '{0}'")]
    Bool(String),
}

/// Erreurs liées aux actions UPnP.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Le device a répondu par un SOAP fault
    #[error(transparent)]
    Upnp(#[from] UpnpError),

    /// Le device n'a pas pu être joint
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("SOAP error: {0}")]
    Soap(#[from] SoapError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error(transparent)]
    Description(#[from] DescriptionError),

    #[error("action ({0}) has no parent service")]
    NoParentService(String),

    #[error("argument ({0}) is not found")]
    ArgumentNotFound(String),

    #[error("action name of action response ({found}) is not equal this action name ({expected})")]
    NameMismatch { expected: String, found: String },

    #[error("argument ({name}): {source}")]
    InvalidValue {
        name: String,
        #[source]
        source: ArgumentValueError,
    },
}

impl ActionError {
    /// Erreur UPnP retournée par le device, le cas échéant.
    pub fn as_upnp(&self) -> Option<&UpnpError> {
        match self {
            ActionError::Upnp(err) => Some(err),
            _ => None,
        }
    }

    /// Vrai si le device a été joint et a rejeté l'action.
    pub fn is_rejected(&self) -> bool {
        self.as_upnp().is_some()
    }
}
