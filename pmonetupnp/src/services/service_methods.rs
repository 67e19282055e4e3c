use std::sync::Arc;

use tracing::debug;
use url::Url;
use xmltree::Element;

use super::{
    DEFAULT_CONTROL_URL_PREFIX, DEFAULT_EVENT_URL_PREFIX, DEFAULT_SCPD_URL_PREFIX,
    SERVICE_NAMESPACE, Service, ServiceLink,
};
use crate::actions::Action;
use crate::devices::{DescriptionError, DeviceLink, SpecVersion};
use crate::http_client::HttpClient;
use crate::state_variables::StateVariable;
use crate::xml::{child_text, children, parse_document, push_element, push_text, write_document};

impl Service {
    pub fn new(service_type: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            service_id: service_id.into(),
            ..Default::default()
        }
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn scpd_url(&self) -> &str {
        &self.scpd_url
    }

    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    pub fn event_sub_url(&self) -> &str {
        &self.event_sub_url
    }

    pub fn set_service_type(&mut self, service_type: impl Into<String>) {
        self.service_type = service_type.into();
        self.relink();
    }

    pub fn set_service_id(&mut self, service_id: impl Into<String>) {
        self.service_id = service_id.into();
        self.relink();
    }

    pub fn set_scpd_url(&mut self, url: impl Into<String>) {
        self.scpd_url = url.into();
        self.relink();
    }

    pub fn set_control_url(&mut self, url: impl Into<String>) {
        self.control_url = url.into();
        self.relink();
    }

    pub fn set_event_sub_url(&mut self, url: impl Into<String>) {
        self.event_sub_url = url.into();
        self.relink();
    }

    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    /// Device propriétaire, si le service est rattaché.
    pub fn device(&self) -> Option<&DeviceLink> {
        self.device.as_deref()
    }

    pub fn link(&self) -> ServiceLink {
        ServiceLink {
            service_type: self.service_type.clone(),
            service_id: self.service_id.clone(),
            scpd_url: self.scpd_url.clone(),
            control_url: self.control_url.clone(),
            event_sub_url: self.event_sub_url.clone(),
            device: self.device.clone(),
        }
    }

    pub(crate) fn attach(&mut self, device: Arc<DeviceLink>) {
        self.device = Some(device);
        self.relink();
    }

    fn relink(&mut self) {
        let link = Arc::new(self.link());
        for action in &mut self.actions {
            action.attach(link.clone());
        }
    }

    /// Vrai si le SCPD a été chargé ou construit localement.
    pub fn has_description(&self) -> bool {
        self.scpd_loaded
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn add_action(&mut self, mut action: Action) {
        action.attach(Arc::new(self.link()));
        self.actions.push(action);
        self.scpd_loaded = true;
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.add_action(action);
        self
    }

    pub fn action_by_name(&self, name: &str) -> Result<&Action, DescriptionError> {
        if !self.scpd_loaded {
            return Err(DescriptionError::NoServiceDescription {
                action: name.to_string(),
                service: self.service_type.clone(),
            });
        }

        self.actions
            .iter()
            .find(|action| action.name() == name)
            .ok_or_else(|| DescriptionError::ActionNotFound {
                action: name.to_string(),
                service: self.service_type.clone(),
            })
    }

    pub fn state_variables(&self) -> &[StateVariable] {
        &self.state_variables
    }

    pub fn state_variable_by_name(&self, name: &str) -> Option<&StateVariable> {
        self.state_variables.iter().find(|var| var.name == name)
    }

    pub fn add_state_variable(&mut self, variable: StateVariable) {
        self.state_variables.push(variable);
        self.scpd_loaded = true;
    }

    pub fn with_state_variable(mut self, variable: StateVariable) -> Self {
        self.add_state_variable(variable);
        self
    }

    /// Charge un document SCPD, remplaçant actions et variables d'état.
    pub fn load_description(&mut self, xml: &str) -> Result<(), DescriptionError> {
        let root = parse_document(xml.as_bytes(), "scpd")?;

        self.spec_version = root
            .get_child("specVersion")
            .map(SpecVersion::from_xml_element)
            .unwrap_or_default();

        self.actions = root
            .get_child("actionList")
            .map(|list| children(list, "action").map(Action::from_xml_element).collect())
            .unwrap_or_default();

        self.state_variables = root
            .get_child("serviceStateTable")
            .map(|table| {
                children(table, "stateVariable")
                    .map(StateVariable::from_xml_element)
                    .collect()
            })
            .unwrap_or_default();

        self.scpd_loaded = true;
        self.relink();
        Ok(())
    }

    /// Récupère et charge le SCPD depuis `SCPDURL`.
    ///
    /// Un service sans `SCPDURL` est laissé tel quel.
    pub fn load_description_from_scpd_url(
        &mut self,
        client: &HttpClient,
    ) -> Result<(), DescriptionError> {
        if self.scpd_url.is_empty() {
            debug!("service {} has no SCPDURL", self.service_type);
            return Ok(());
        }

        let url = self.absolute_scpd_url()?;
        let xml = client.get(url.as_str())?;
        self.load_description(&xml)
    }

    pub(crate) fn to_scpd_element(&self) -> Element {
        let mut root = Element::new("scpd");
        root.attributes
            .insert("xmlns".to_string(), SERVICE_NAMESPACE.to_string());
        push_element(&mut root, self.spec_version.to_xml_element());

        let mut action_list = Element::new("actionList");
        for action in &self.actions {
            push_element(&mut action_list, action.to_xml_element());
        }
        push_element(&mut root, action_list);

        let mut table = Element::new("serviceStateTable");
        for variable in &self.state_variables {
            push_element(&mut table, variable.to_xml_element());
        }
        push_element(&mut root, table);

        root
    }

    /// Document SCPD sérialisé.
    pub fn description_string(&self) -> Result<String, DescriptionError> {
        write_document(&self.to_scpd_element())
    }

    /// Entrée `<service>` de la `serviceList` du device.
    pub(crate) fn from_xml_element(elem: &Element) -> Self {
        Self {
            service_type: child_text(elem, "serviceType"),
            service_id: child_text(elem, "serviceId"),
            scpd_url: child_text(elem, "SCPDURL"),
            control_url: child_text(elem, "controlURL"),
            event_sub_url: child_text(elem, "eventSubURL"),
            ..Default::default()
        }
    }

    pub(crate) fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("service");
        push_text(&mut elem, "serviceType", &self.service_type);
        push_text(&mut elem, "serviceId", &self.service_id);
        push_text(&mut elem, "SCPDURL", &self.scpd_url);
        push_text(&mut elem, "controlURL", &self.control_url);
        push_text(&mut elem, "eventSubURL", &self.event_sub_url);
        elem
    }

    /// Forme courte du type : avant-dernier composant de `serviceType`,
    /// ou le `serviceId` si le type n'a pas de `:`.
    pub(crate) fn short_service_type(&self) -> &str {
        let parts: Vec<&str> = self.service_type.split(':').collect();
        if parts.len() <= 1 {
            return &self.service_id;
        }
        parts[parts.len() - 2]
    }

    /// Complète les URLs absentes à partir de la forme courte du type.
    pub(crate) fn revise_description(&mut self) {
        let short = self.short_service_type().to_string();

        if self.scpd_url.is_empty() {
            self.scpd_url = format!("{}{}.xml", DEFAULT_SCPD_URL_PREFIX, short);
        }
        if self.control_url.is_empty() {
            self.control_url = format!("{}{}", DEFAULT_CONTROL_URL_PREFIX, short);
        }
        if self.event_sub_url.is_empty() {
            self.event_sub_url = format!("{}{}", DEFAULT_EVENT_URL_PREFIX, short);
        }
        self.relink();
    }

    pub fn is_scpd_url(&self, path: &str) -> bool {
        self.scpd_url == path
    }

    pub fn is_control_url(&self, path: &str) -> bool {
        self.control_url == path
    }

    pub fn is_event_sub_url(&self, path: &str) -> bool {
        self.event_sub_url == path
    }

    pub fn absolute_scpd_url(&self) -> Result<Url, DescriptionError> {
        self.link().absolute_scpd_url()
    }

    pub fn absolute_control_url(&self) -> Result<Url, DescriptionError> {
        self.link().absolute_control_url()
    }

    pub fn absolute_event_sub_url(&self) -> Result<Url, DescriptionError> {
        self.link().absolute_event_sub_url()
    }
}
