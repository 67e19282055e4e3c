//! Erreurs relatives aux descriptions de devices et de services.

use pmoutils::UrlError;
use thiserror::Error;

use crate::http_client::HttpError;

/// Erreurs de chargement, d'analyse ou de recherche dans une description.
#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    Emit(#[from] xmltree::Error),

    #[error("description is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Élément racine inattendu
    #[error("unexpected root element <{found}> (expected <{expected}>)")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("missing <{0}> element")]
    MissingElement(&'static str),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error("SSDP packet has no LOCATION header")]
    MissingLocation,

    #[error("location url is invalid ({0})")]
    BadLocationUrl(String),

    #[error(
        "URLBase and location url are invalid ('{url_base}', '{location_url}'). Couldn't get an absolute URL ('{path}')"
    )]
    NoAbsoluteUrl {
        url_base: String,
        location_url: String,
        path: String,
    },

    #[error("service ({0}) has no parent device")]
    NoParentDevice(String),

    #[error("service ({0}) is not found")]
    ServiceNotFound(String),

    #[error("embedded device ({0}) is not found")]
    EmbeddedDeviceNotFound(String),

    #[error("action ({action}) is not found. service ({service}) description is not loaded.")]
    NoServiceDescription { action: String, service: String },

    #[error("action ({action}) is not found in the service ({service})")]
    ActionNotFound { action: String, service: String },
}
