use std::ops::{Deref, DerefMut};

use super::{
    DISCOVER, M_SEARCH, NOTIFY, NTS_ALIVE, NTS_BYEBYE, NTS_UPDATE, Packet, PacketError,
    ROOT_DEVICE, header,
};

/// Requête SSDP (M-SEARCH ou NOTIFY)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    packet: Packet,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, PacketError> {
        Packet::parse(bytes).map(Self::from)
    }

    /// Construit un M-SEARCH multicast pour la cible `st`.
    pub fn new_search(st: &str, mx: u32) -> Self {
        let mut packet = Packet::new();
        packet.set_method(M_SEARCH);
        packet.set_host(super::multicast_host());
        packet.set_man(DISCOVER);
        packet.set_st(st);
        packet.set_mx(mx);
        Self { packet }
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }

    pub fn is_search(&self) -> bool {
        self.packet.is_method(M_SEARCH)
    }

    pub fn is_notify(&self) -> bool {
        self.packet.is_method(NOTIFY)
    }

    pub fn is_discover(&self) -> bool {
        self.packet.is_header(header::MAN, DISCOVER)
    }

    pub fn is_root_device(&self) -> bool {
        self.packet.is_header(header::ST, ROOT_DEVICE)
    }

    /// Annonce d'un root device (`NT: upnp:rootdevice`)
    pub fn is_root_device_notify(&self) -> bool {
        self.packet.is_header(header::NT, ROOT_DEVICE)
    }

    pub fn is_alive(&self) -> bool {
        self.packet.is_header(header::NTS, NTS_ALIVE)
    }

    pub fn is_bye_bye(&self) -> bool {
        self.packet.is_header(header::NTS, NTS_BYEBYE)
    }

    pub fn is_update(&self) -> bool {
        self.packet.is_header(header::NTS, NTS_UPDATE)
    }
}

impl From<Packet> for Request {
    fn from(packet: Packet) -> Self {
        Self { packet }
    }
}

impl Deref for Request {
    type Target = Packet;

    fn deref(&self) -> &Packet {
        &self.packet
    }
}

impl DerefMut for Request {
    fn deref_mut(&mut self) -> &mut Packet {
        &mut self.packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_helpers() {
        let req = Request::parse(
            b"M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nMAN: \"ssdp:discover\"\r\nMX: 3\r\nST: upnp:rootdevice\r\n\r\n",
        )
        .unwrap();
        assert!(req.is_search());
        assert!(!req.is_notify());
        assert!(req.is_discover());
        assert!(req.is_root_device());
        assert_eq!(req.mx(), Some(3));
    }

    #[test]
    fn test_new_search_layout() {
        let req = Request::new_search("ssdp:all", 2);
        assert_eq!(
            req.to_string(),
            "M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nMAN: \"ssdp:discover\"\r\nST: ssdp:all\r\nMX: 2\r\n\r\n"
        );
    }

    #[test]
    fn test_notify_subtypes() {
        let alive = Request::parse(
            b"NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\nNTS: ssdp:alive\r\n\r\n",
        )
        .unwrap();
        assert!(alive.is_notify());
        assert!(alive.is_alive());
        assert!(alive.is_root_device_notify());
        assert!(!alive.is_bye_bye());

        let bye = Request::parse(b"NOTIFY * HTTP/1.1\r\nNTS: ssdp:byebye\r\n\r\n").unwrap();
        assert!(bye.is_bye_bye());

        let update = Request::parse(b"NOTIFY * HTTP/1.1\r\nNTS: ssdp:update\r\n\r\n").unwrap();
        assert!(update.is_update());
    }
}
