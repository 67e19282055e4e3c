//! Analyse, sérialisation et parcours des descriptions de devices.

use std::sync::Arc;

use pmoutils::{absolute_url, create_uuid, udn_from_uuid, url_origin};
use tracing::{debug, warn};
use url::Url;
use xmltree::Element;

use super::{
    DEFAULT_DESCRIPTION_URL, DEVICE_NAMESPACE, DEVICE_PROTOCOL, DescriptionError, Device,
    DeviceInfo, DeviceLink, Icon, SpecVersion,
};
use crate::http_client::HttpClient;
use crate::services::Service;
use crate::ssdp::Packet;
use crate::xml::{
    child_text, children, parse_document, push_element, push_opt_text, push_text, write_document,
};

impl DeviceLink {
    /// Résout `path` en URL absolue : `URLBase` de la racine, puis
    /// l'origine de l'URL de localisation, puis le chemin seul.
    pub fn absolute_url(&self, path: &str) -> Result<Url, DescriptionError> {
        if !self.url_base.is_empty() {
            if let Ok(url) = absolute_url(&self.url_base, path) {
                return Ok(url);
            }
        }

        if !self.location_url.is_empty() {
            let origin = url_origin(&self.location_url)
                .map_err(|_| DescriptionError::BadLocationUrl(self.location_url.clone()))?;
            if let Ok(url) = absolute_url(&origin, path) {
                return Ok(url);
            }
        }

        absolute_url("", path).map_err(|_| DescriptionError::NoAbsoluteUrl {
            url_base: self.url_base.clone(),
            location_url: self.location_url.clone(),
            path: path.to_string(),
        })
    }
}

impl Device {
    pub fn new(device_type: impl Into<String>, friendly_name: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            info: DeviceInfo {
                friendly_name: friendly_name.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Construit un device racine depuis un document `<root>`.
    pub fn from_description(xml: &str) -> Result<Self, DescriptionError> {
        let root = parse_document(xml.as_bytes(), "root")?;
        let device_elem = root
            .get_child("device")
            .ok_or(DescriptionError::MissingElement("device"))?;

        let mut device = Self::from_xml_element(device_elem);
        device.spec_version = root
            .get_child("specVersion")
            .map(SpecVersion::from_xml_element)
            .unwrap_or_default();
        device.url_base = child_text(&root, "URLBase");
        device.relink();
        Ok(device)
    }

    /// Récupère et analyse la description publiée à `url`.
    ///
    /// L'URL de localisation du device est positionnée sur `url`.
    pub fn from_description_url(url: &str, client: &HttpClient) -> Result<Self, DescriptionError> {
        let xml = client.get(url)?;
        let mut device = Self::from_description(&xml)?;
        device.set_location_url(url);
        Ok(device)
    }

    /// Construit un device depuis l'en-tête `LOCATION` d'un message SSDP
    /// (NOTIFY ou réponse de recherche).
    pub fn from_ssdp_packet(packet: &Packet, client: &HttpClient) -> Result<Self, DescriptionError> {
        let location = packet
            .location()
            .ok_or(DescriptionError::MissingLocation)?;
        Self::from_description_url(location, client)
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn set_device_type(&mut self, device_type: impl Into<String>) {
        self.device_type = device_type.into();
        self.relink();
    }

    pub fn udn(&self) -> &str {
        &self.udn
    }

    pub fn set_udn(&mut self, udn: impl Into<String>) {
        self.udn = udn.into();
        self.relink();
    }

    /// Positionne l'UDN `uuid:<uuid>`.
    pub fn set_uuid(&mut self, uuid: &str) {
        self.set_udn(udn_from_uuid(uuid));
    }

    pub fn friendly_name(&self) -> &str {
        &self.info.friendly_name
    }

    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    pub fn set_spec_version(&mut self, version: SpecVersion) {
        self.spec_version = version;
    }

    pub fn url_base(&self) -> &str {
        &self.url_base
    }

    pub fn set_url_base(&mut self, url_base: impl Into<String>) {
        self.url_base = url_base.into();
        self.relink();
    }

    pub fn location_url(&self) -> &str {
        &self.location_url
    }

    pub fn set_location_url(&mut self, url: impl Into<String>) {
        self.location_url = url.into();
        self.relink();
    }

    pub fn description_url(&self) -> &str {
        &self.description_url
    }

    pub fn set_description_url(&mut self, url: impl Into<String>) {
        self.description_url = url.into();
    }

    /// Device parent, pour un device embarqué.
    pub fn parent(&self) -> Option<&DeviceLink> {
        self.parent.as_deref()
    }

    pub fn is_root_device(&self) -> bool {
        self.parent.is_none()
    }

    /// Lien vers ce device tel que le voient ses enfants.
    pub fn link(&self) -> DeviceLink {
        let (url_base, location_url) = match &self.parent {
            Some(parent) => (parent.url_base.clone(), parent.location_url.clone()),
            None => (self.url_base.clone(), self.location_url.clone()),
        };

        DeviceLink {
            device_type: self.device_type.clone(),
            udn: self.udn.clone(),
            parent_udn: self.parent.as_ref().map(|parent| parent.udn.clone()),
            url_base,
            location_url,
        }
    }

    /// Reconstruit les liens de toute la descendance.
    fn relink(&mut self) {
        let link = Arc::new(self.link());
        for service in &mut self.services {
            service.attach(link.clone());
        }
        for device in &mut self.devices {
            device.parent = Some(link.clone());
            device.relink();
        }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Accès mutable aux services ; leurs liens vers ce device restent valides.
    pub fn services_mut(&mut self) -> &mut [Service] {
        &mut self.services
    }

    pub fn add_service(&mut self, mut service: Service) {
        service.attach(Arc::new(self.link()));
        self.services.push(service);
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.add_service(service);
        self
    }

    pub fn embedded_devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn add_embedded_device(&mut self, mut device: Device) {
        device.parent = Some(Arc::new(self.link()));
        device.relink();
        self.devices.push(device);
    }

    pub fn with_embedded_device(mut self, device: Device) -> Self {
        self.add_embedded_device(device);
        self
    }

    pub fn embedded_device_by_type(&self, device_type: &str) -> Result<&Device, DescriptionError> {
        self.devices
            .iter()
            .find(|device| device.device_type == device_type)
            .ok_or_else(|| DescriptionError::EmbeddedDeviceNotFound(device_type.to_string()))
    }

    fn find_service(
        &self,
        key: &str,
        predicate: impl Fn(&Service) -> bool,
    ) -> Result<&Service, DescriptionError> {
        self.services
            .iter()
            .find(|service| predicate(service))
            .ok_or_else(|| DescriptionError::ServiceNotFound(key.to_string()))
    }

    pub fn service_by_type(&self, service_type: &str) -> Result<&Service, DescriptionError> {
        self.find_service(service_type, |s| s.service_type() == service_type)
    }

    pub fn service_by_id(&self, service_id: &str) -> Result<&Service, DescriptionError> {
        self.find_service(service_id, |s| s.service_id() == service_id)
    }

    pub fn service_by_control_url(&self, url: &str) -> Result<&Service, DescriptionError> {
        self.find_service(url, |s| s.is_control_url(url))
    }

    pub fn service_by_event_sub_url(&self, url: &str) -> Result<&Service, DescriptionError> {
        self.find_service(url, |s| s.is_event_sub_url(url))
    }

    pub fn service_by_scpd_url(&self, url: &str) -> Result<&Service, DescriptionError> {
        self.find_service(url, |s| s.is_scpd_url(url))
    }

    /// Vrai si ce device ou un device embarqué est du type donné.
    pub fn has_device_type(&self, device_type: &str) -> bool {
        self.device_type == device_type
            || self.devices.iter().any(|d| d.has_device_type(device_type))
    }

    /// Vrai si ce device ou un device embarqué expose le type de service.
    pub fn has_service_type(&self, service_type: &str) -> bool {
        self.services.iter().any(|s| s.service_type() == service_type)
            || self.devices.iter().any(|d| d.has_service_type(service_type))
    }

    /// Charge le SCPD de chaque service, devices embarqués compris.
    ///
    /// Le chargement continue après un échec ; la dernière erreur est
    /// retournée.
    pub fn load_service_descriptions(&mut self, client: &HttpClient) -> Result<(), DescriptionError> {
        let mut last_error = None;

        for service in &mut self.services {
            if let Err(err) = service.load_description_from_scpd_url(client) {
                warn!("❌ SCPD of {} not loaded: {}", service.service_type(), err);
                last_error = Some(err);
            }
        }

        for device in &mut self.devices {
            if let Err(err) = device.load_service_descriptions(client) {
                last_error = Some(err);
            }
        }

        match last_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Complète la description avant publication : chemin de
    /// description, UDN et URLs par défaut des services.
    pub(crate) fn revise_description(&mut self) {
        if self.description_url.is_empty() {
            self.description_url = DEFAULT_DESCRIPTION_URL.to_string();
        }

        if self.udn.is_empty() {
            self.udn = udn_from_uuid(&create_uuid());
            debug!("generated UDN {} for {}", self.udn, self.device_type);
        }

        for service in &mut self.services {
            service.revise_description();
        }

        for device in &mut self.devices {
            device.revise_description();
        }

        self.relink();
    }

    /// URL de localisation annoncée pour une adresse d'interface.
    pub(crate) fn location_url_for(&self, address: &str, port: u16) -> Result<Url, DescriptionError> {
        let base = format!("{}://{}:{}", DEVICE_PROTOCOL, address, port);
        Ok(absolute_url(&base, &self.description_url)?)
    }

    pub fn absolute_url(&self, path: &str) -> Result<Url, DescriptionError> {
        self.link().absolute_url(path)
    }

    /// Document `<root>` de description sérialisé.
    pub fn description_string(&self) -> Result<String, DescriptionError> {
        let mut root = Element::new("root");
        root.attributes
            .insert("xmlns".to_string(), DEVICE_NAMESPACE.to_string());
        push_element(&mut root, self.spec_version.to_xml_element());
        push_opt_text(&mut root, "URLBase", &self.url_base);
        push_element(&mut root, self.to_xml_element());
        write_document(&root)
    }

    fn from_xml_element(elem: &Element) -> Self {
        let info = DeviceInfo {
            friendly_name: child_text(elem, "friendlyName"),
            manufacturer: child_text(elem, "manufacturer"),
            manufacturer_url: child_text(elem, "manufacturerURL"),
            model_description: child_text(elem, "modelDescription"),
            model_name: child_text(elem, "modelName"),
            model_number: child_text(elem, "modelNumber"),
            model_url: child_text(elem, "modelURL"),
            serial_number: child_text(elem, "serialNumber"),
            upc: child_text(elem, "UPC"),
            presentation_url: child_text(elem, "presentationURL"),
        };

        let icons = elem
            .get_child("iconList")
            .map(|list| children(list, "icon").map(icon_from_xml).collect())
            .unwrap_or_default();

        let services = elem
            .get_child("serviceList")
            .map(|list| children(list, "service").map(Service::from_xml_element).collect())
            .unwrap_or_default();

        let devices = elem
            .get_child("deviceList")
            .map(|list| children(list, "device").map(Device::from_xml_element).collect())
            .unwrap_or_default();

        Self {
            device_type: child_text(elem, "deviceType"),
            udn: child_text(elem, "UDN"),
            info,
            icons,
            services,
            devices,
            ..Default::default()
        }
    }

    fn to_xml_element(&self) -> Element {
        let info = &self.info;
        let mut elem = Element::new("device");

        push_text(&mut elem, "deviceType", &self.device_type);
        push_text(&mut elem, "friendlyName", &info.friendly_name);
        push_text(&mut elem, "manufacturer", &info.manufacturer);
        push_opt_text(&mut elem, "manufacturerURL", &info.manufacturer_url);
        push_opt_text(&mut elem, "modelDescription", &info.model_description);
        push_text(&mut elem, "modelName", &info.model_name);
        push_opt_text(&mut elem, "modelNumber", &info.model_number);
        push_opt_text(&mut elem, "modelURL", &info.model_url);
        push_opt_text(&mut elem, "serialNumber", &info.serial_number);
        push_text(&mut elem, "UDN", &self.udn);
        push_opt_text(&mut elem, "UPC", &info.upc);

        if !self.icons.is_empty() {
            let mut list = Element::new("iconList");
            for icon in &self.icons {
                push_element(&mut list, icon_to_xml(icon));
            }
            push_element(&mut elem, list);
        }

        if !self.services.is_empty() {
            let mut list = Element::new("serviceList");
            for service in &self.services {
                push_element(&mut list, service.to_xml_element());
            }
            push_element(&mut elem, list);
        }

        if !self.devices.is_empty() {
            let mut list = Element::new("deviceList");
            for device in &self.devices {
                push_element(&mut list, device.to_xml_element());
            }
            push_element(&mut elem, list);
        }

        push_opt_text(&mut elem, "presentationURL", &info.presentation_url);
        elem
    }
}

fn icon_from_xml(elem: &Element) -> Icon {
    Icon {
        mimetype: child_text(elem, "mimetype"),
        width: child_text(elem, "width"),
        height: child_text(elem, "height"),
        depth: child_text(elem, "depth"),
        url: child_text(elem, "url"),
    }
}

fn icon_to_xml(icon: &Icon) -> Element {
    let mut elem = Element::new("icon");
    push_text(&mut elem, "mimetype", &icon.mimetype);
    push_text(&mut elem, "width", &icon.width);
    push_text(&mut elem, "height", &icon.height);
    push_text(&mut elem, "depth", &icon.depth);
    push_text(&mut elem, "url", &icon.url);
    elem
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHT: &str = "urn:schemas-upnp-org:device:BinaryLight:1";
    const SWITCH_POWER: &str = "urn:schemas-upnp-org:service:SwitchPower:1";
    const DIMMING: &str = "urn:schemas-upnp-org:service:Dimming:1";

    const GATEWAY_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType>
    <friendlyName>Gateway</friendlyName>
    <manufacturer>ACME</manufacturer>
    <modelName>GW-1</modelName>
    <UDN>uuid:gateway-1</UDN>
    <iconList>
      <icon><mimetype>image/png</mimetype><width>48</width><height>48</height><depth>24</depth><url>/icon.png</url></icon>
    </iconList>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:Layer3Forwarding:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:L3Forwarding1</serviceId>
        <SCPDURL>/l3f.xml</SCPDURL>
        <controlURL>/l3f/control</controlURL>
        <eventSubURL>/l3f/event</eventSubURL>
      </service>
    </serviceList>
    <deviceList>
      <device>
        <deviceType>urn:schemas-upnp-org:device:WANDevice:1</deviceType>
        <friendlyName>WAN</friendlyName>
        <UDN>uuid:wan-1</UDN>
        <serviceList>
          <service>
            <serviceType>urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1</serviceType>
            <serviceId>urn:upnp-org:serviceId:WANCommonIFC1</serviceId>
            <SCPDURL>/wancic.xml</SCPDURL>
            <controlURL>/wancic/control</controlURL>
            <eventSubURL>/wancic/event</eventSubURL>
          </service>
        </serviceList>
      </device>
    </deviceList>
    <presentationURL>http://192.168.1.1/</presentationURL>
  </device>
</root>"#;

    fn light() -> Device {
        Device::new(LIGHT, "Light").with_service(Service::new(
            SWITCH_POWER,
            "urn:upnp-org:serviceId:SwitchPower.0001",
        ))
    }

    #[test]
    fn test_from_description() {
        let device = Device::from_description(GATEWAY_DESCRIPTION).unwrap();
        assert_eq!(device.udn(), "uuid:gateway-1");
        assert_eq!(device.friendly_name(), "Gateway");
        assert_eq!(device.info.manufacturer, "ACME");
        assert_eq!(device.info.presentation_url, "http://192.168.1.1/");
        assert_eq!(device.spec_version(), SpecVersion::new(1, 0));
        assert_eq!(device.icons.len(), 1);
        assert_eq!(device.icons[0].url, "/icon.png");
        assert!(device.is_root_device());

        let service = &device.services()[0];
        assert_eq!(service.device().unwrap().udn, "uuid:gateway-1");

        let wan = device
            .embedded_device_by_type("urn:schemas-upnp-org:device:WANDevice:1")
            .unwrap();
        assert!(!wan.is_root_device());
        assert_eq!(wan.parent().unwrap().udn, "uuid:gateway-1");
        let wan_service = &wan.services()[0];
        assert_eq!(
            wan_service.device().unwrap().parent_udn.as_deref(),
            Some("uuid:gateway-1")
        );
    }

    #[test]
    fn test_from_description_rejects_missing_device() {
        assert!(matches!(
            Device::from_description("<root><URLBase>x</URLBase></root>"),
            Err(DescriptionError::MissingElement("device"))
        ));
        assert!(matches!(
            Device::from_description("<scpd/>"),
            Err(DescriptionError::UnexpectedRoot { .. })
        ));
        assert!(matches!(
            Device::from_description("<root><device>"),
            Err(DescriptionError::Xml(_))
        ));
    }

    #[test]
    fn test_recursive_type_lookups() {
        let device = Device::from_description(GATEWAY_DESCRIPTION).unwrap();
        assert!(device.has_device_type("urn:schemas-upnp-org:device:WANDevice:1"));
        assert!(device.has_service_type("urn:schemas-upnp-org:service:WANCommonInterfaceConfig:1"));
        assert!(!device.has_service_type(SWITCH_POWER));
        assert!(device.service_by_type(SWITCH_POWER).is_err());
        assert!(device.service_by_id("urn:upnp-org:serviceId:L3Forwarding1").is_ok());
        assert!(device.service_by_control_url("/l3f/control").is_ok());
        assert!(device.service_by_event_sub_url("/l3f/event").is_ok());
        assert!(matches!(
            device.embedded_device_by_type(LIGHT),
            Err(DescriptionError::EmbeddedDeviceNotFound(_))
        ));
    }

    #[test]
    fn test_absolute_url_resolution_order() {
        let mut device = Device::from_description(GATEWAY_DESCRIPTION).unwrap();
        let wan = &device.embedded_devices()[0];
        assert!(wan.services()[0].absolute_control_url().is_err());

        device.set_location_url("http://192.168.1.1:5000/rootDesc.xml");
        let wan = &device.embedded_devices()[0];
        assert_eq!(
            wan.services()[0].absolute_control_url().unwrap().as_str(),
            "http://192.168.1.1:5000/wancic/control"
        );

        device.set_url_base("http://10.0.0.1:80/base/");
        assert_eq!(
            device.services()[0].absolute_scpd_url().unwrap().as_str(),
            "http://10.0.0.1/base/l3f.xml"
        );

        device.set_location_url("not a url");
        device.set_url_base("");
        assert!(matches!(
            device.absolute_url("/x"),
            Err(DescriptionError::BadLocationUrl(_))
        ));

        device.set_location_url("");
        assert!(matches!(
            device.absolute_url("/x"),
            Err(DescriptionError::NoAbsoluteUrl { .. })
        ));
        assert_eq!(
            device.absolute_url("http://host/x").unwrap().as_str(),
            "http://host/x"
        );
    }

    #[test]
    fn test_revise_description() {
        let mut device = light();
        device.revise_description();

        assert_eq!(device.description_url(), "/description.xml");
        assert!(device.udn().starts_with("uuid:"));
        let service = &device.services()[0];
        assert_eq!(service.control_url(), "/service/control/SwitchPower");
        assert_eq!(service.device().unwrap().udn, device.udn());

        let udn = device.udn().to_string();
        device.revise_description();
        assert_eq!(device.udn(), udn);
    }

    #[test]
    fn test_setters_relink_children() {
        let mut device = light().with_embedded_device(
            Device::new("urn:schemas-upnp-org:device:DimmableLight:1", "Dimmer")
                .with_service(Service::new(DIMMING, "urn:upnp-org:serviceId:Dimming.0001")),
        );
        device.set_udn("uuid:light-2");
        device.set_location_url("http://10.0.0.5:6004/description.xml");

        assert_eq!(device.services()[0].device().unwrap().udn, "uuid:light-2");
        let dimmer = &device.embedded_devices()[0];
        assert_eq!(dimmer.parent().unwrap().udn, "uuid:light-2");
        let link = dimmer.services()[0].device().unwrap();
        assert_eq!(link.parent_udn.as_deref(), Some("uuid:light-2"));
        assert_eq!(link.location_url, "http://10.0.0.5:6004/description.xml");
    }

    #[test]
    fn test_description_string_reparses() {
        let mut device = light();
        device.info.manufacturer = "ACME".to_string();
        device.icons.push(Icon {
            mimetype: "image/png".to_string(),
            url: "/icon.png".to_string(),
            ..Default::default()
        });
        device.revise_description();

        let xml = device.description_string().unwrap();
        assert!(xml.contains(DEVICE_NAMESPACE));
        assert!(!xml.contains("URLBase"));

        let parsed = Device::from_description(&xml).unwrap();
        assert_eq!(parsed.udn(), device.udn());
        assert_eq!(parsed.info, device.info);
        assert_eq!(parsed.icons, device.icons);
        assert_eq!(parsed.spec_version(), SpecVersion::default());
        assert_eq!(
            parsed.services()[0].scpd_url(),
            "/service/scpd/SwitchPower.xml"
        );
    }

    #[test]
    fn test_location_url_for() {
        let mut device = light();
        device.revise_description();
        assert_eq!(
            device.location_url_for("192.168.1.20", 6100).unwrap().as_str(),
            "http://192.168.1.20:6100/description.xml"
        );
    }

    #[test]
    fn test_from_ssdp_packet_requires_location() {
        let packet = Packet::new();
        assert!(matches!(
            Device::from_ssdp_packet(&packet, &HttpClient::default()),
            Err(DescriptionError::MissingLocation)
        ));
    }
}
