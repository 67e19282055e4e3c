//! Invocation SOAP d'une action et conversions côté device.

use tracing::trace;

use super::{Action, ActionError, Direction};
use crate::http_client::HttpClient;
use crate::soap::{
    SoapAction, build_soap_request, build_soap_response, parse_soap_fault, parse_soap_response,
};

impl Action {
    /// Invoque l'action sur le device distant avec le client partagé
    /// [`HttpClient::shared`].
    ///
    /// Voir [`Action::post_with`].
    pub fn post(&mut self) -> Result<(), ActionError> {
        self.post_with(HttpClient::shared())
    }

    /// Invoque l'action sur le device distant.
    ///
    /// Les arguments `in` sont envoyés ; en cas de succès les valeurs
    /// retournées sont recopiées sur les arguments de même nom.
    ///
    /// # Errors
    ///
    /// - [`ActionError::Upnp`] si le device a répondu par un fault SOAP
    /// - [`ActionError::Http`] si le device n'a pas pu être joint
    pub fn post_with(&mut self, client: &HttpClient) -> Result<(), ActionError> {
        let service = self
            .service
            .clone()
            .ok_or_else(|| ActionError::NoParentService(self.name.clone()))?;

        let body = build_soap_request(
            &service.service_type,
            &self.name,
            &self.argument_values(Direction::In),
        )?;
        let control_url = service.absolute_control_url()?;
        let soap_action = format!("{}#{}", service.service_type, self.name);

        trace!("📤 action req = \n{}", body);
        let (status, response) = client.post_soap(control_url.as_str(), &soap_action, body)?;
        trace!("📥 action res [{}] = \n{}", status, response);

        if status == 200 {
            let parsed = parse_soap_response(response.as_bytes())?;
            self.set_argument_values(&parsed.name, &parsed.arguments)
        } else {
            Err(ActionError::Upnp(parse_soap_fault(response.as_bytes())?))
        }
    }

    /// Applique une requête SOAP reçue sur les arguments de l'action.
    pub(crate) fn apply_soap_request(&mut self, request: &SoapAction) -> Result<(), ActionError> {
        self.set_argument_values(&request.name, &request.arguments)
    }

    /// Réponse SOAP portant les arguments `out`.
    pub(crate) fn soap_response(&self) -> Result<String, ActionError> {
        let service_type = self
            .service
            .as_ref()
            .map(|service| service.service_type.as_str())
            .ok_or_else(|| ActionError::NoParentService(self.name.clone()))?;

        Ok(build_soap_response(
            service_type,
            &self.name,
            &self.argument_values(Direction::Out),
        )?)
    }
}
