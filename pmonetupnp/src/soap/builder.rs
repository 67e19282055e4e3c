//! Construction des enveloppes SOAP

use xmltree::{Element, EmitterConfig};

use super::{SOAP_ENCODING_STYLE, SOAP_ENVELOPE_NS, SoapError, UPNP_CONTROL_NS, UpnpError};
use crate::xml::{push_element, push_text};

/// Sérialise `s:Envelope` / `s:Body` autour de `body_child`.
fn build_soap_envelope_with_body(body_child: Element) -> Result<String, SoapError> {
    let mut body = Element::new("s:Body");
    push_element(&mut body, body_child);

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope
        .attributes
        .insert("s:encodingStyle".to_string(), SOAP_ENCODING_STYLE.to_string());
    push_element(&mut envelope, body);

    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    String::from_utf8(buf).map_err(|e| SoapError::Utf8(e.utf8_error()))
}

fn build_action_element(
    element_name: &str,
    service_type: &str,
    args: &[(String, String)],
) -> Element {
    let mut elem = Element::new(&format!("u:{}", element_name));
    elem.attributes
        .insert("xmlns:u".to_string(), service_type.to_string());

    for (name, value) in args {
        push_text(&mut elem, name, value);
    }
    elem
}

/// Construit une requête d'action SOAP.
///
/// Les arguments sont émis dans l'ordre fourni.
pub fn build_soap_request(
    service_type: &str,
    action: &str,
    args: &[(String, String)],
) -> Result<String, SoapError> {
    build_soap_envelope_with_body(build_action_element(action, service_type, args))
}

/// Construit une réponse d'action SOAP (`<u:{action}Response>`).
pub fn build_soap_response(
    service_type: &str,
    action: &str,
    args: &[(String, String)],
) -> Result<String, SoapError> {
    let name = format!("{}{}", action, super::RESPONSE_SUFFIX);
    build_soap_envelope_with_body(build_action_element(&name, service_type, args))
}

/// Construit un fault SOAP portant une erreur UPnP.
pub fn build_soap_fault(error: &UpnpError) -> Result<String, SoapError> {
    let mut upnp_error = Element::new("UPnPError");
    upnp_error
        .attributes
        .insert("xmlns".to_string(), UPNP_CONTROL_NS.to_string());
    push_text(&mut upnp_error, "errorCode", &error.code.to_string());
    push_text(&mut upnp_error, "errorDescription", &error.description);

    let mut detail = Element::new("detail");
    push_element(&mut detail, upnp_error);

    let mut fault = Element::new("s:Fault");
    push_text(&mut fault, "faultcode", "s:Client");
    push_text(&mut fault, "faultstring", "UPnPError");
    push_element(&mut fault, detail);

    build_soap_envelope_with_body(fault)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::UpnpError;

    fn args(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_request() {
        let xml = build_soap_request(
            "urn:schemas-upnp-org:service:SwitchPower:1",
            "SetTarget",
            &args(&[("newTargetValue", "1")]),
        )
        .unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<u:SetTarget"));
        assert!(xml.contains("xmlns:u=\"urn:schemas-upnp-org:service:SwitchPower:1\""));
        assert!(xml.contains("<newTargetValue>1</newTargetValue>"));
        assert!(xml.contains("xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\""));
        assert!(xml.contains("s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\""));
    }

    #[test]
    fn test_build_response_escapes_values() {
        let xml = build_soap_response(
            "urn:schemas-upnp-org:service:SwitchPower:1",
            "GetTarget",
            &args(&[("RetTargetValue", "a<b&c")]),
        )
        .unwrap();

        assert!(xml.contains("GetTargetResponse"));
        assert!(xml.contains("a&lt;b&amp;c"));
    }

    #[test]
    fn test_build_fault() {
        let xml = build_soap_fault(&UpnpError::from_code(401)).unwrap();

        assert!(xml.contains("<s:Fault>"));
        assert!(xml.contains("<faultcode>s:Client</faultcode>"));
        assert!(xml.contains("<faultstring>UPnPError</faultstring>"));
        assert!(xml.contains("xmlns=\"urn:schemas-upnp-org:control-1-0\""));
        assert!(xml.contains("<errorCode>401</errorCode>"));
        assert!(xml.contains("<errorDescription>Invalid Action</errorDescription>"));
    }
}
