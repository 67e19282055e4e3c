use std::ops::{Deref, DerefMut};

use super::{HTTP_VERSION, Packet, PacketError};

/// Réponse SSDP unicast (`HTTP/1.1 200 OK`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    packet: Packet,
}

/// Libellé HTTP d'un code de statut.
fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}

/// Date au format RFC 1123 (`Mon, 02 Jan 2006 15:04:05 GMT`)
pub(crate) fn rfc1123_now() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

impl Response {
    /// Réponse 200 avec `SERVER`, `EXT` vide et `DATE` courante.
    pub fn new(server: &str) -> Self {
        let mut response = Self {
            packet: Packet::new(),
        };
        response.set_status_code(200);
        response.packet.set_server(server);
        response.packet.set_ext("");
        response.packet.set_date(rfc1123_now());
        response
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        Packet::parse(bytes).map(Self::from)
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }

    pub fn set_status_code(&mut self, code: u16) {
        self.packet
            .set_first_line([HTTP_VERSION.to_string(), code.to_string(), status_text(code).to_string()]);
    }

    /// Code de statut de la première ligne, 0 s'il est illisible.
    pub fn status_code(&self) -> u16 {
        self.packet
            .first_line()
            .get(1)
            .and_then(|code| code.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_ok(&self) -> bool {
        self.status_code() == 200
    }
}

impl From<Packet> for Response {
    fn from(packet: Packet) -> Self {
        Self { packet }
    }
}

impl Deref for Response {
    type Target = Packet;

    fn deref(&self) -> &Packet {
        &self.packet
    }
}

impl DerefMut for Response {
    fn deref_mut(&mut self) -> &mut Packet {
        &mut self.packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response_defaults() {
        let res = Response::new("Linux/6.1 UPnP/1.1 test/1.0");
        assert_eq!(res.status_code(), 200);
        assert!(res.is_ok());
        assert_eq!(res.server(), Some("Linux/6.1 UPnP/1.1 test/1.0"));
        assert_eq!(res.ext(), Some(""));
        assert!(res.date().is_some_and(|d| d.ends_with(" GMT")));
        assert!(res.to_string().starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_parse_status_code() {
        let res = Response::parse(b"HTTP/1.1 404 Not Found\r\n\r\n").unwrap();
        assert_eq!(res.status_code(), 404);

        let res = Response::parse(b"HTTP/1.1 abc\r\n\r\n").unwrap();
        assert_eq!(res.status_code(), 0);
    }

    #[test]
    fn test_set_status_code() {
        let mut res = Response::new("srv");
        res.set_status_code(500);
        assert_eq!(res.first_line(), &["HTTP/1.1", "500", "Internal Server Error"]);
    }
}
