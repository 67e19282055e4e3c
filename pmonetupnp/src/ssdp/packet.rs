//! Codec du format texte SSDP.

use std::fmt;
use std::net::SocketAddr;

use pmoutils::NetInterface;
use thiserror::Error;

use super::{CRLF, HTTP_VERSION, header};

/// Erreur de parsing d'un datagramme SSDP
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet length is zero")]
    Empty,

    #[error("first line is not found")]
    NoFirstLine,

    #[error("headers are not found ({begin}:{end})")]
    InvalidHeaderBlock { begin: usize, end: usize },
}

/// Datagramme SSDP : jetons de la première ligne et en-têtes.
///
/// Les clés d'en-têtes sont normalisées en majuscules et uniques ; une
/// nouvelle écriture remplace la valeur en conservant la position
/// d'origine, ce qui rend la sérialisation stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    first_line: Vec<String>,
    headers: Vec<(String, String)>,
    from: Option<SocketAddr>,
    interface: Option<NetInterface>,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse un datagramme.
    ///
    /// L'absence de ligne vide finale est tolérée : la fin du buffer tient
    /// alors lieu de limite du bloc d'en-têtes.
    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.is_empty() {
            return Err(PacketError::Empty);
        }

        let first_end = find(bytes, CRLF.as_bytes()).ok_or(PacketError::NoFirstLine)?;
        let first_line = String::from_utf8_lossy(&bytes[..first_end]);

        let begin = first_end + CRLF.len();
        let end = find(bytes, b"\r\n\r\n").unwrap_or(bytes.len());
        if end < first_end || begin > bytes.len() {
            return Err(PacketError::InvalidHeaderBlock { begin, end });
        }

        let mut packet = Packet {
            first_line: first_line.split(' ').map(str::to_string).collect(),
            ..Default::default()
        };

        if end > begin {
            let block = String::from_utf8_lossy(&bytes[begin..end]);
            for line in block.split(CRLF) {
                let pair = line.split_once(": ").or_else(|| line.split_once(':'));
                match pair {
                    Some((key, value)) if !key.is_empty() => {
                        packet.set_header(key, value.trim_start());
                    }
                    _ => tracing::trace!("Skipping malformed SSDP header line: '{}'", line),
                }
            }
        }

        Ok(packet)
    }

    /// Sérialise le paquet (première ligne, en-têtes, ligne vide).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    pub fn first_line(&self) -> &[String] {
        &self.first_line
    }

    pub fn set_first_line<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.first_line = tokens.into_iter().map(Into::into).collect();
    }

    /// Première ligne de requête `<method> * HTTP/1.1`.
    pub fn set_method(&mut self, method: &str) {
        self.set_first_line([method, "*", HTTP_VERSION]);
    }

    pub fn method(&self) -> Option<&str> {
        self.first_line.first().map(String::as_str)
    }

    pub fn is_method(&self, method: &str) -> bool {
        self.method() == Some(method)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Valeur d'un en-tête (nom insensible à la casse).
    pub fn header(&self, name: &str) -> Option<&str> {
        let key = name.to_ascii_uppercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let key = name.to_ascii_uppercase();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    pub fn is_header(&self, name: &str, value: &str) -> bool {
        self.header(name) == Some(value)
    }

    pub fn header_int(&self, name: &str) -> Option<i64> {
        self.header(name)?.trim().parse().ok()
    }

    pub fn from(&self) -> Option<SocketAddr> {
        self.from
    }

    pub fn set_from(&mut self, from: SocketAddr) {
        self.from = Some(from);
    }

    /// Interface sur laquelle le paquet a été reçu.
    pub fn interface(&self) -> Option<&NetInterface> {
        self.interface.as_ref()
    }

    pub fn set_interface(&mut self, interface: NetInterface) {
        self.interface = Some(interface);
    }

    pub fn host(&self) -> Option<&str> {
        self.header(header::HOST)
    }

    pub fn set_host(&mut self, value: impl Into<String>) {
        self.set_header(header::HOST, value);
    }

    pub fn man(&self) -> Option<&str> {
        self.header(header::MAN)
    }

    pub fn set_man(&mut self, value: impl Into<String>) {
        self.set_header(header::MAN, value);
    }

    pub fn mx(&self) -> Option<i64> {
        self.header_int(header::MX)
    }

    pub fn set_mx(&mut self, value: u32) {
        self.set_header(header::MX, value.to_string());
    }

    pub fn st(&self) -> Option<&str> {
        self.header(header::ST)
    }

    pub fn set_st(&mut self, value: impl Into<String>) {
        self.set_header(header::ST, value);
    }

    pub fn nt(&self) -> Option<&str> {
        self.header(header::NT)
    }

    pub fn set_nt(&mut self, value: impl Into<String>) {
        self.set_header(header::NT, value);
    }

    pub fn nts(&self) -> Option<&str> {
        self.header(header::NTS)
    }

    pub fn set_nts(&mut self, value: impl Into<String>) {
        self.set_header(header::NTS, value);
    }

    pub fn usn(&self) -> Option<&str> {
        self.header(header::USN)
    }

    pub fn set_usn(&mut self, value: impl Into<String>) {
        self.set_header(header::USN, value);
    }

    pub fn location(&self) -> Option<&str> {
        self.header(header::LOCATION)
    }

    pub fn set_location(&mut self, value: impl Into<String>) {
        self.set_header(header::LOCATION, value);
    }

    pub fn server(&self) -> Option<&str> {
        self.header(header::SERVER)
    }

    pub fn set_server(&mut self, value: impl Into<String>) {
        self.set_header(header::SERVER, value);
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT)
    }

    pub fn set_user_agent(&mut self, value: impl Into<String>) {
        self.set_header(header::USER_AGENT, value);
    }

    pub fn cache_control(&self) -> Option<&str> {
        self.header(header::CACHE_CONTROL)
    }

    pub fn set_cache_control(&mut self, value: impl Into<String>) {
        self.set_header(header::CACHE_CONTROL, value);
    }

    /// `max-age` de l'en-tête CACHE-CONTROL
    pub fn max_age(&self) -> u32 {
        super::parse_max_age(self.cache_control())
    }

    pub fn date(&self) -> Option<&str> {
        self.header(header::DATE)
    }

    pub fn set_date(&mut self, value: impl Into<String>) {
        self.set_header(header::DATE, value);
    }

    pub fn ext(&self) -> Option<&str> {
        self.header(header::EXT)
    }

    pub fn set_ext(&mut self, value: impl Into<String>) {
        self.set_header(header::EXT, value);
    }

    pub fn boot_id(&self) -> Option<i64> {
        self.header_int(header::BOOTID)
    }

    pub fn set_boot_id(&mut self, value: i64) {
        self.set_header(header::BOOTID, value.to_string());
    }

    pub fn sid(&self) -> Option<&str> {
        self.header(header::SID)
    }

    pub fn set_sid(&mut self, value: impl Into<String>) {
        self.set_header(header::SID, value);
    }

    pub fn seq(&self) -> Option<i64> {
        self.header_int(header::SEQ)
    }

    pub fn set_seq(&mut self, value: i64) {
        self.set_header(header::SEQ, value.to_string());
    }

    pub fn callback(&self) -> Option<&str> {
        self.header(header::CALLBACK)
    }

    pub fn set_callback(&mut self, value: impl Into<String>) {
        self.set_header(header::CALLBACK, value);
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.first_line.join(" "), CRLF)?;
        for (key, value) in &self.headers {
            write!(f, "{}: {}{}", key, value, CRLF)?;
        }
        f.write_str(CRLF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = "M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nMAN: \"ssdp:discover\"\r\nMX: 3\r\nST: upnp:rootdevice\r\n\r\n";

    #[test]
    fn test_parse_search_packet() {
        let packet = Packet::parse(SEARCH.as_bytes()).unwrap();
        assert_eq!(packet.first_line(), &["M-SEARCH", "*", "HTTP/1.1"]);
        assert_eq!(packet.host(), Some("239.255.255.250:1900"));
        assert_eq!(packet.man(), Some("\"ssdp:discover\""));
        assert_eq!(packet.mx(), Some(3));
        assert_eq!(packet.st(), Some("upnp:rootdevice"));
    }

    #[test]
    fn test_serialize_is_inverse_of_parse() {
        let packet = Packet::parse(SEARCH.as_bytes()).unwrap();
        assert_eq!(packet.to_string(), SEARCH);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Packet::parse(b""), Err(PacketError::Empty));
    }

    #[test]
    fn test_parse_rejects_missing_first_line() {
        assert_eq!(
            Packet::parse(b"NOTIFY * HTTP/1.1"),
            Err(PacketError::NoFirstLine)
        );
    }

    #[test]
    fn test_parse_tolerates_unterminated_packet() {
        let packet = Packet::parse(b"NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\nNTS: ssdp:alive").unwrap();
        assert!(packet.is_method("NOTIFY"));
        assert_eq!(packet.nt(), Some("upnp:rootdevice"));
        assert_eq!(packet.nts(), Some("ssdp:alive"));
    }

    #[test]
    fn test_header_keys_are_uppercased_and_unique() {
        let packet =
            Packet::parse(b"HTTP/1.1 200 OK\r\nlocation: http://a/1\r\nLocation: http://a/2\r\nExt:\r\n\r\n")
                .unwrap();
        assert_eq!(packet.headers().len(), 2);
        assert_eq!(packet.location(), Some("http://a/2"));
        assert_eq!(packet.ext(), Some(""));
    }

    #[test]
    fn test_header_value_keeps_colons() {
        let packet =
            Packet::parse(b"HTTP/1.1 200 OK\r\nUSN: uuid:1234::upnp:rootdevice\r\n\r\n").unwrap();
        assert_eq!(packet.usn(), Some("uuid:1234::upnp:rootdevice"));
    }

    #[test]
    fn test_set_header_overwrites_in_place() {
        let mut packet = Packet::new();
        packet.set_method("NOTIFY");
        packet.set_nt("a");
        packet.set_nts("ssdp:alive");
        packet.set_header("nt", "b");
        assert_eq!(
            packet.to_string(),
            "NOTIFY * HTTP/1.1\r\nNT: b\r\nNTS: ssdp:alive\r\n\r\n"
        );
    }
}
