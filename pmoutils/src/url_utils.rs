//! Résolution d'URL absolues à partir d'une base et d'un chemin.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("url ({0}) is not absolute")]
    NotAbsolute(String),

    #[error("url scheme ({0}) is unknown")]
    UnknownScheme(String),
}

/// Construit une URL absolue HTTP(S) à partir d'une base et d'un chemin.
///
/// Si `path` est déjà une URL absolue, elle est utilisée telle quelle.
/// Sinon la base et le chemin sont concaténés avec un unique `/`.
///
/// ```
/// use pmoutils::absolute_url;
///
/// let url = absolute_url("http://192.168.1.10:6004/", "/service/control/SwitchPower").unwrap();
/// assert_eq!(url.as_str(), "http://192.168.1.10:6004/service/control/SwitchPower");
/// ```
pub fn absolute_url(base: &str, path: &str) -> Result<Url, UrlError> {
    let url = match Url::parse(path) {
        Ok(url) => url,
        Err(_) => {
            let joined = format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/').trim_end_matches('/')
            );
            Url::parse(&joined).map_err(|_| UrlError::NotAbsolute(joined.clone()))?
        }
    };

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UrlError::UnknownScheme(other.to_string())),
    }
}

/// Retourne `scheme://host[:port]` pour une URL donnée.
pub fn url_origin(url: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(url).map_err(|_| UrlError::NotAbsolute(url.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| UrlError::NotAbsolute(url.to_string()))?;

    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_joins_base_and_path() {
        let url = absolute_url("http://10.0.0.1:80", "description.xml").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.1/description.xml");

        let url = absolute_url("http://10.0.0.1:5000/", "/scpd/").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.1:5000/scpd");
    }

    #[test]
    fn test_absolute_url_keeps_absolute_path() {
        let url = absolute_url("http://10.0.0.1:5000", "http://10.0.0.2:6000/ctrl").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.2:6000/ctrl");
    }

    #[test]
    fn test_absolute_url_rejects_relative_result() {
        assert!(matches!(
            absolute_url("", "/service/control"),
            Err(UrlError::NotAbsolute(_))
        ));
    }

    #[test]
    fn test_absolute_url_rejects_unknown_scheme() {
        assert!(matches!(
            absolute_url("", "ftp://10.0.0.1/file"),
            Err(UrlError::UnknownScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_url_origin() {
        assert_eq!(
            url_origin("http://192.168.1.5:49152/desc.xml").unwrap(),
            "http://192.168.1.5:49152"
        );
        assert_eq!(url_origin("https://host/a/b").unwrap(), "https://host");
    }
}
