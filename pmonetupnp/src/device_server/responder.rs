//! Réponses du device aux requêtes SSDP et HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{CONTENT_TYPE, SERVER};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use pmoutils::{NetInterface, select_interface_for_addr};
use tracing::{debug, info, trace, warn};

use super::{ActionListener, HttpListener, HttpRequest};
use crate::actions::Action;
use crate::devices::{DescriptionError, Device};
use crate::http_client::{CONTENT_TYPE_XML, SOAP_ACTION_HEADER};
use crate::logging::Logger;
use crate::settings::UpnpSettings;
use crate::soap::{UpnpError, build_soap_fault, codes, parse_soap_action};
use crate::ssdp::{MAX_AGE, MulticastListener, Request, Response as SsdpResponse, SsdpError, SsdpSocket};

/// État partagé entre le serveur multicast et le serveur HTTP.
pub(super) struct Responder {
    device: Arc<Device>,
    logger: Logger,
    server: String,
    port: u16,
    ttl: u32,
    read_timeout: Duration,
    interfaces: Vec<NetInterface>,
    action_listener: Option<Arc<dyn ActionListener>>,
    http_listener: Option<Arc<dyn HttpListener>>,
    ssdp_listener: Option<Arc<dyn MulticastListener>>,
}

/// Nom d'action d'un en-tête SOAPACTION (`"urn:...:1#Action"`).
pub(super) fn soap_action_name(header: &str) -> Option<&str> {
    let value = header.trim().trim_matches('"');
    let (_, name) = value.rsplit_once('#')?;
    (!name.is_empty()).then_some(name)
}

/// `USN` d'une réponse de recherche pour la cible `st`.
fn usn_for(udn: &str, st: &str) -> String {
    if st == udn {
        udn.to_string()
    } else {
        format!("{}::{}", udn, st)
    }
}

impl Responder {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        device: Arc<Device>,
        settings: &UpnpSettings,
        logger: Logger,
        port: u16,
        interfaces: Vec<NetInterface>,
        action_listener: Option<Arc<dyn ActionListener>>,
        http_listener: Option<Arc<dyn HttpListener>>,
        ssdp_listener: Option<Arc<dyn MulticastListener>>,
    ) -> Self {
        Self {
            device,
            logger,
            server: settings.user_agent(),
            port,
            ttl: settings.multicast_ttl,
            read_timeout: settings.read_timeout,
            interfaces,
            action_listener,
            http_listener,
            ssdp_listener,
        }
    }

    // SSDP

    fn matches_search(&self, request: &Request) -> bool {
        if !request.is_discover() {
            return false;
        }
        if request.is_root_device() {
            return true;
        }
        match request.st() {
            Some(st) => self.device.has_device_type(st) || self.device.has_service_type(st),
            None => false,
        }
    }

    /// Réponse 200 OK à un M-SEARCH, émise depuis l'interface la plus
    /// proche du demandeur.
    pub(super) fn search_response(
        &self,
        request: &Request,
        reply_interface: &NetInterface,
    ) -> Result<SsdpResponse, DescriptionError> {
        let location = self
            .device
            .location_url_for(&reply_interface.address.to_string(), self.port)?;
        let st = request.st().unwrap_or_default();

        let mut response = SsdpResponse::new(&self.server);
        response.set_location(location.as_str());
        response.set_st(st);
        response.set_usn(usn_for(self.device.udn(), st));
        response.set_cache_control(format!("max-age={}", MAX_AGE));
        Ok(response)
    }

    fn reply_interface(&self, from: &SocketAddr) -> Option<NetInterface> {
        select_interface_for_addr(self.interfaces.clone(), &from.ip().to_string()).ok()
    }

    fn post_search_response(&self, request: &Request) -> Result<(), SsdpError> {
        let Some(from) = request.from() else {
            return Ok(());
        };
        let Some(interface) = self.reply_interface(&from) else {
            warn!("❌ No interface to answer {}", from);
            return Ok(());
        };
        let response = match self.search_response(request, &interface) {
            Ok(response) => response,
            Err(e) => {
                warn!("❌ Cannot build search response: {}", e);
                return Ok(());
            }
        };

        let socket = SsdpSocket::unicast(&interface, 0, self.ttl, self.read_timeout)?;
        socket.send_to(&response.to_bytes(), from)?;
        debug!("📤 SSDP response sent to {} from {}\n{}", from, interface, response.packet());
        Ok(())
    }

    // HTTP

    pub(super) fn handle_http(&self, request: HttpRequest) -> Response {
        self.logger.scope(|| {
            info!("{} {}", request.method, request.path);

            let handled = match request.method {
                Method::GET => self.handle_get(&request),
                Method::POST => self.handle_post(&request),
                _ => None,
            };

            match handled {
                Some(response) => response,
                None => match &self.http_listener {
                    Some(listener) => listener.http_request_received(&request),
                    None => self.status_response(StatusCode::BAD_REQUEST),
                },
            }
        })
    }

    fn status_response(&self, status: StatusCode) -> Response {
        (status, [(SERVER, self.server.clone())]).into_response()
    }

    fn xml_response(&self, status: StatusCode, xml: String) -> Response {
        (
            status,
            [
                (SERVER, self.server.clone()),
                (CONTENT_TYPE, CONTENT_TYPE_XML.to_string()),
            ],
            xml,
        )
            .into_response()
    }

    fn description_response(&self, xml: Result<String, DescriptionError>) -> Response {
        match xml {
            Ok(xml) => self.xml_response(StatusCode::OK, xml),
            Err(e) => {
                warn!("❌ Description not serialized: {}", e);
                self.status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn upnp_error_response(&self, error: &UpnpError) -> Response {
        match build_soap_fault(error) {
            Ok(xml) => self.xml_response(StatusCode::INTERNAL_SERVER_ERROR, xml),
            Err(e) => {
                warn!("❌ SOAP fault not serialized: {}", e);
                self.status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn handle_get(&self, request: &HttpRequest) -> Option<Response> {
        if request.path == self.device.description_url() {
            return Some(self.description_response(self.device.description_string()));
        }

        let service = self.device.service_by_scpd_url(&request.path).ok()?;
        Some(self.description_response(service.description_string()))
    }

    fn handle_post(&self, request: &HttpRequest) -> Option<Response> {
        let service = self.device.service_by_control_url(&request.path).ok()?;
        let action_name = soap_action_name(request.header(SOAP_ACTION_HEADER)?)?;
        let action = service.action_by_name(action_name).ok()?;

        Some(self.handle_action(request, action.clone()))
    }

    fn handle_action(&self, request: &HttpRequest, mut action: Action) -> Response {
        let Some(listener) = &self.action_listener else {
            return self.upnp_error_response(&UpnpError::from_code(
                codes::OPTIONAL_ACTION_NOT_IMPLEMENTED,
            ));
        };

        trace!("📥 action req = \n{}", String::from_utf8_lossy(&request.body));

        let soap_request = match parse_soap_action(&request.body) {
            Ok(soap_request) => soap_request,
            Err(e) => {
                debug!("❌ SOAP request not parsed: {}", e);
                return self.upnp_error_response(&UpnpError::from_code(codes::INVALID_ACTION));
            }
        };

        if let Err(e) = action.apply_soap_request(&soap_request) {
            debug!("❌ SOAP arguments not applied: {}", e);
            return self.upnp_error_response(&UpnpError::from_code(codes::INVALID_ARGS));
        }

        if let Err(error) = listener.action_request_received(&mut action) {
            return self.upnp_error_response(&error);
        }

        match action.soap_response() {
            Ok(xml) => {
                trace!("📤 action res = \n{}", xml);
                self.xml_response(StatusCode::OK, xml)
            }
            Err(e) => {
                warn!("❌ SOAP response not serialized: {}", e);
                self.upnp_error_response(&UpnpError::from_code(codes::ACTION_FAILED))
            }
        }
    }
}

impl MulticastListener for Responder {
    fn device_notify_received(&self, request: &Request) {
        if let Some(listener) = &self.ssdp_listener {
            listener.device_notify_received(request);
        }
    }

    fn device_search_received(&self, request: &Request) {
        if self.matches_search(request) {
            if let Err(e) = self.post_search_response(request) {
                warn!("❌ SSDP response not sent: {}", e);
            }
        }

        if let Some(listener) = &self.ssdp_listener {
            listener.device_search_received(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, UdpSocket};

    const LIGHT: &str = "urn:schemas-upnp-org:device:BinaryLight:1";

    fn loopback() -> NetInterface {
        NetInterface::new("lo", Ipv4Addr::LOCALHOST)
    }

    fn responder() -> Responder {
        let mut device = Device::new(LIGHT, "Light");
        device.set_udn("uuid:light-1");
        device.revise_description();
        Responder::new(
            Arc::new(device),
            &UpnpSettings::default(),
            Logger::none(),
            6100,
            vec![loopback()],
            None,
            None,
            None,
        )
    }

    fn search(st: &str) -> Request {
        Request::new_search(st, 1)
    }

    #[test]
    fn test_soap_action_name() {
        assert_eq!(
            soap_action_name("\"urn:schemas-upnp-org:service:SwitchPower:1#SetTarget\""),
            Some("SetTarget")
        );
        assert_eq!(soap_action_name("urn:a#b#GetTarget"), Some("GetTarget"));
        assert_eq!(soap_action_name("\"NoHash\""), None);
        assert_eq!(soap_action_name("\"urn:a#\""), None);
    }

    #[test]
    fn test_search_matching() {
        let responder = responder();
        assert!(responder.matches_search(&search("upnp:rootdevice")));
        assert!(responder.matches_search(&search(LIGHT)));
        assert!(!responder.matches_search(&search("urn:schemas-upnp-org:device:Other:1")));

        let mut not_discover = search(LIGHT);
        not_discover.set_man("\"ssdp:other\"");
        assert!(!responder.matches_search(&not_discover));
    }

    #[test]
    fn test_search_response_headers() {
        let responder = responder();
        let response = responder
            .search_response(&search("upnp:rootdevice"), &loopback())
            .unwrap();

        assert!(response.is_ok());
        assert_eq!(response.location(), Some("http://127.0.0.1:6100/description.xml"));
        assert_eq!(response.st(), Some("upnp:rootdevice"));
        assert_eq!(response.usn(), Some("uuid:light-1::upnp:rootdevice"));
        assert_eq!(response.cache_control(), Some("max-age=1800"));
        assert!(response.server().is_some_and(|s| s.contains("UPnP/1.1")));

        let by_udn = responder
            .search_response(&search("uuid:light-1"), &loopback())
            .unwrap();
        assert_eq!(by_udn.usn(), Some("uuid:light-1"));
    }

    #[test]
    fn test_search_is_answered_by_unicast() {
        let responder = responder();
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let mut request = search("upnp:rootdevice");
        request.set_from(peer.local_addr().unwrap());
        responder.device_search_received(&request);

        let mut buf = [0u8; 2048];
        let (n, _) = peer.recv_from(&mut buf).unwrap();
        let response = SsdpResponse::parse(&buf[..n]).unwrap();
        assert_eq!(response.location(), Some("http://127.0.0.1:6100/description.xml"));
    }
}
