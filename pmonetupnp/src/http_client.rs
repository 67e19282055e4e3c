//! Client HTTP bloquant pour les descriptions et le contrôle SOAP.

use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use ureq::Agent;

use crate::settings::UpnpSettings;

pub const CONTENT_TYPE_XML: &str = r#"text/xml; charset="utf-8""#;
pub const SOAP_ACTION_HEADER: &str = "SOAPACTION";

static SHARED: OnceLock<HttpClient> = OnceLock::new();

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] ureq::Error),

    #[error("{url} is bad response ({status})")]
    Status { url: String, status: u16 },
}

/// Client HTTP partagé (clonable, l'agent ureq est un `Arc`).
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: Agent,
    user_agent: String,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        // Les statuts d'erreur sont lus comme des valeurs : un fault SOAP
        // arrive avec un 500.
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: config.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_settings(settings: &UpnpSettings) -> Self {
        Self::new(settings.http_timeout, settings.user_agent())
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET d'un document ; tout statut autre que 200 est une erreur.
    pub fn get(&self, url: &str) -> Result<String, HttpError> {
        debug!("📥 GET {}", url);
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(HttpError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response.body_mut().read_to_string()?)
    }

    /// POST d'une enveloppe SOAP. Retourne le statut et le corps brut.
    pub fn post_soap(
        &self,
        url: &str,
        soap_action: &str,
        body: String,
    ) -> Result<(u16, String), HttpError> {
        debug!("📤 POST {} ({})", url, soap_action);
        let mut response = self
            .agent
            .post(url)
            .header("Content-Type", CONTENT_TYPE_XML)
            .header("User-Agent", &self.user_agent)
            .header(SOAP_ACTION_HEADER, &format!("\"{}\"", soap_action))
            .send(body)?;

        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string()?;
        Ok((status, text))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::from_settings(&UpnpSettings::default())
    }
}

impl HttpClient {
    /// Client du processus, construit au premier appel avec les réglages
    /// par défaut. Son agent (et donc son pool de connexions) est réutilisé
    /// par tous les appelants.
    pub fn shared() -> &'static HttpClient {
        SHARED.get_or_init(HttpClient::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_host_is_transport_error() {
        let client = HttpClient::new(Duration::from_millis(500), "test/1.0");
        // Port 9 (discard) fermé sur loopback.
        let err = client.get("http://127.0.0.1:9/description.xml").unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
    }

    #[test]
    fn test_shared_client_is_built_once() {
        let first = HttpClient::shared();
        let second = HttpClient::shared();
        assert!(std::ptr::eq(first, second));
        assert!(first.user_agent().contains("UPnP/1.1"));
    }

    #[test]
    fn test_default_user_agent() {
        let client = HttpClient::default();
        assert!(client.user_agent().contains("UPnP/1.1"));
    }
}
