//! Services UPnP.
//!
//! Un [`Service`] est déclaré dans la `serviceList` d'un device ; ses
//! actions et variables d'état proviennent d'un document SCPD séparé,
//! chargé explicitement ou récupéré à la demande depuis son `SCPDURL`.
//!
//! Chaque action porte un [`ServiceLink`], instantané immuable des
//! champs du service nécessaires à son invocation. Ce lien est
//! reconstruit à chaque modification d'un de ces champs.

mod service_methods;

use std::sync::Arc;

use url::Url;

use crate::actions::Action;
use crate::devices::{DescriptionError, DeviceLink, SpecVersion};
use crate::state_variables::StateVariable;

pub const DEFAULT_SCPD_URL_PREFIX: &str = "/service/scpd/";
pub const DEFAULT_CONTROL_URL_PREFIX: &str = "/service/control/";
pub const DEFAULT_EVENT_URL_PREFIX: &str = "/service/event/";

pub const SERVICE_NAMESPACE: &str = "urn:schemas-upnp-org:service-1-0";

#[derive(Debug, Clone, Default)]
pub struct Service {
    service_type: String,
    service_id: String,
    scpd_url: String,
    control_url: String,
    event_sub_url: String,
    spec_version: SpecVersion,
    actions: Vec<Action>,
    state_variables: Vec<StateVariable>,
    scpd_loaded: bool,
    device: Option<Arc<DeviceLink>>,
}

/// Vue d'un service depuis ses actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLink {
    pub service_type: String,
    pub service_id: String,
    pub scpd_url: String,
    pub control_url: String,
    pub event_sub_url: String,
    pub device: Option<Arc<DeviceLink>>,
}

impl ServiceLink {
    fn absolute_url(&self, path: &str) -> Result<Url, DescriptionError> {
        match &self.device {
            Some(device) => Ok(device.absolute_url(path)?),
            None => Err(DescriptionError::NoParentDevice(self.service_type.clone())),
        }
    }

    pub fn absolute_scpd_url(&self) -> Result<Url, DescriptionError> {
        self.absolute_url(&self.scpd_url)
    }

    pub fn absolute_control_url(&self) -> Result<Url, DescriptionError> {
        self.absolute_url(&self.control_url)
    }

    pub fn absolute_event_sub_url(&self) -> Result<Url, DescriptionError> {
        self.absolute_url(&self.event_sub_url)
    }
}
