//! Traitement des messages de découverte et enregistrement des devices.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use super::ControlPointListener;
use crate::devices::{DescriptionError, Device, DeviceMap};
use crate::http_client::HttpClient;
use crate::ssdp::{MulticastListener, Packet, Request, Response, UnicastListener};

/// Délégué branché sur les serveurs SSDP du point de contrôle.
///
/// Il possède le registre, enregistre les devices annoncés puis
/// transmet chaque évènement au listener utilisateur.
pub(crate) struct Discovery {
    registry: Mutex<DeviceMap>,
    client: HttpClient,
    listener: RwLock<Option<Arc<dyn ControlPointListener>>>,
}

fn from_to(packet: &Packet) -> String {
    let from = packet.from().map(|addr| addr.to_string()).unwrap_or_default();
    let to = packet
        .interface()
        .map(|iface| iface.address.to_string())
        .unwrap_or_default();
    format!("({} -> {})", from, to)
}

impl Discovery {
    pub(crate) fn new(client: HttpClient) -> Self {
        Self {
            registry: Mutex::new(DeviceMap::new()),
            client,
            listener: RwLock::new(None),
        }
    }

    pub(crate) fn set_listener(&self, listener: Option<Arc<dyn ControlPointListener>>) {
        *self.listener.write() = listener;
    }

    fn listener(&self) -> Option<Arc<dyn ControlPointListener>> {
        self.listener.read().clone()
    }

    pub(crate) fn client(&self) -> &HttpClient {
        &self.client
    }

    pub(crate) fn registry(&self) -> parking_lot::MutexGuard<'_, DeviceMap> {
        self.registry.lock()
    }

    /// Charge la description publiée à `location` et enregistre le device.
    ///
    /// Les téléchargements ont lieu hors du verrou du registre ; seule
    /// l'insertion finale, idempotente, le prend. Retourne `false` si le
    /// device était déjà connu.
    pub(crate) fn register(&self, location: &str) -> Result<bool, DescriptionError> {
        let mut device = Device::from_description_url(location, &self.client)?;

        if self.registry.lock().contains(&device) {
            trace!(
                "device ({}, {}) is already added",
                device.device_type(),
                device.udn()
            );
            return Ok(false);
        }

        device.load_service_descriptions(&self.client)?;

        let added = self.registry.lock().add(device.clone());
        if added {
            debug!(
                "✅ device ({}, {}) is added",
                device.device_type(),
                device.udn()
            );
        }
        Ok(added)
    }

    fn register_logged(&self, location: Option<&str>) {
        let Some(location) = location else {
            warn!("❌ SSDP message without LOCATION");
            return;
        };
        if let Err(err) = self.register(location) {
            warn!("❌ device at {} not added: {}", location, err);
        }
    }
}

impl MulticastListener for Discovery {
    fn device_notify_received(&self, request: &Request) {
        trace!(
            "notify req : {} {}",
            request.usn().unwrap_or_default(),
            from_to(request)
        );

        if request.is_root_device_notify() && !request.is_bye_bye() {
            self.register_logged(request.location());
        }

        if let Some(listener) = self.listener() {
            listener.device_notify_received(request);
        }
    }

    fn device_search_received(&self, request: &Request) {
        trace!(
            "search req : {} {}",
            request.st().unwrap_or_default(),
            from_to(request)
        );

        if let Some(listener) = self.listener() {
            listener.device_search_received(request);
        }
    }
}

impl UnicastListener for Discovery {
    fn device_response_received(&self, response: &Response) {
        trace!(
            "search res : {} {}",
            response.location().unwrap_or_default(),
            from_to(response)
        );

        self.register_logged(response.location());

        if let Some(listener) = self.listener() {
            listener.device_response_received(response);
        }
    }
}
