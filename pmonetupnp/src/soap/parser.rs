//! Décodage générique des enveloppes SOAP.
//!
//! Les noms d'arguments ne sont connus que par le SCPD du service : le
//! décodage se fait en deux temps sur un flux de jetons `quick-xml`.
//!
//! 1. [`extract_body`] repère `Envelope` puis `Body` et capture le contenu
//!    du corps sous forme de balisage brut ;
//! 2. ce balisage est re-tokenisé : le premier élément donne le nom de
//!    l'action, ses enfants les couples `(argument, valeur)`, quel que
//!    soit leur préfixe de namespace.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::{Decoder, Reader};

use super::{RESPONSE_SUFFIX, SoapError, UpnpError};

/// Action UPnP extraite d'une enveloppe SOAP
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapAction {
    /// Nom de l'action (ex: "SetTarget")
    pub name: String,

    /// Namespace `xmlns:*` porté par l'élément d'action (le type de service)
    pub service_type: Option<String>,

    /// Arguments dans l'ordre du document
    pub arguments: Vec<(String, String)>,
}

impl SoapAction {
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn namespace_attr(e: &BytesStart<'_>, decoder: Decoder) -> Result<Option<String>, SoapError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            let value = attr.decode_and_unescape_value(decoder)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, SoapError> {
    if let Some(ch) = reference.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = reference.decode().map_err(quick_xml::Error::from)?;
    Ok(resolve_predefined_entity(&name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("&{};", name)))
}

fn to_str(xml: &[u8]) -> Result<&str, SoapError> {
    Ok(std::str::from_utf8(xml)?)
}

/// Capture le contenu brut de `Envelope/Body`.
pub fn extract_body(xml: &[u8]) -> Result<String, SoapError> {
    let mut reader = Reader::from_str(to_str(xml)?);
    let mut in_envelope = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match local_name(&e).as_str() {
                "Envelope" => in_envelope = true,
                "Body" if in_envelope => {
                    let inner = reader.read_text(e.name())?;
                    return Ok(inner.into_owned());
                }
                _ => {}
            },
            Event::Empty(e) => match local_name(&e).as_str() {
                "Envelope" => return Err(SoapError::MissingBody),
                "Body" if in_envelope => return Ok(String::new()),
                _ => {}
            },
            Event::Eof => {
                return Err(if in_envelope {
                    SoapError::MissingBody
                } else {
                    SoapError::MissingEnvelope
                });
            }
            _ => {}
        }
    }
}

/// Parcourt le balisage du corps : premier élément = action, enfants =
/// arguments.
fn walk_action(markup: &str) -> Result<SoapAction, SoapError> {
    let mut reader = Reader::from_str(markup);
    let decoder = reader.decoder();

    let mut action: Option<SoapAction> = None;
    let mut current: Option<(String, String)> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                match depth {
                    1 => {
                        action = Some(SoapAction {
                            name: local_name(&e),
                            service_type: namespace_attr(&e, decoder)?,
                            arguments: Vec::new(),
                        });
                    }
                    2 => current = Some((local_name(&e), String::new())),
                    _ => {}
                }
            }
            Event::Empty(e) => match depth {
                0 => {
                    return Ok(SoapAction {
                        name: local_name(&e),
                        service_type: namespace_attr(&e, decoder)?,
                        arguments: Vec::new(),
                    });
                }
                1 => {
                    if let Some(action) = action.as_mut() {
                        action.arguments.push((local_name(&e), String::new()));
                    }
                }
                _ => {}
            },
            Event::Text(t) if depth == 2 => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&t.decode().map_err(quick_xml::Error::from)?);
                }
            }
            Event::GeneralRef(r) if depth == 2 => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&resolve_reference(&r)?);
                }
            }
            Event::CData(c) if depth == 2 => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let (Some(action), Some(arg)) = (action.as_mut(), current.take()) {
                        action.arguments.push(arg);
                    }
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    action.ok_or(SoapError::NoAction)
}

/// Décode une requête d'action SOAP.
pub fn parse_soap_action(xml: &[u8]) -> Result<SoapAction, SoapError> {
    walk_action(&extract_body(xml)?)
}

/// Décode une réponse d'action ; le suffixe `Response` est retiré du nom.
pub fn parse_soap_response(xml: &[u8]) -> Result<SoapAction, SoapError> {
    let mut action = walk_action(&extract_body(xml)?)?;
    if let Some(name) = action.name.strip_suffix(RESPONSE_SUFFIX) {
        action.name = name.to_string();
    }
    Ok(action)
}

/// Décode un fault SOAP et retourne l'erreur UPnP qu'il porte.
pub fn parse_soap_fault(xml: &[u8]) -> Result<UpnpError, SoapError> {
    let markup = extract_body(xml)?;
    let mut reader = Reader::from_str(&markup);

    let mut in_fault = false;
    let mut field: Option<String> = None;
    let mut code = String::new();
    let mut description = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "Fault" {
                    in_fault = true;
                }
                field = Some(name);
            }
            Event::Empty(e) => {
                if local_name(&e) == "Fault" {
                    in_fault = true;
                }
            }
            Event::Text(t) => {
                let text = t.decode().map_err(quick_xml::Error::from)?;
                match field.as_deref() {
                    Some("errorCode") => code.push_str(&text),
                    Some("errorDescription") => description.push_str(&text),
                    _ => {}
                }
            }
            Event::GeneralRef(r) => {
                if field.as_deref() == Some("errorDescription") {
                    description.push_str(&resolve_reference(&r)?);
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                match field.as_deref() {
                    Some("errorCode") => code.push_str(&text),
                    Some("errorDescription") => description.push_str(&text),
                    _ => {}
                }
            }
            Event::End(_) => field = None,
            Event::Eof => break,
            _ => {}
        }
    }

    if !in_fault {
        return Err(SoapError::NotAFault);
    }

    let code = code.trim();
    let code = code
        .parse::<u32>()
        .map_err(|_| SoapError::InvalidErrorCode(code.to_string()))?;
    Ok(UpnpError::new(code, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::{build_soap_fault, build_soap_request, build_soap_response};

    const SERVICE: &str = "urn:schemas-upnp-org:service:SwitchPower:1";

    fn args(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_simple_action() {
        let xml = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:SetTarget xmlns:u="urn:schemas-upnp-org:service:SwitchPower:1">
      <newTargetValue>1</newTargetValue>
    </u:SetTarget>
  </s:Body>
</s:Envelope>"#;

        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "SetTarget");
        assert_eq!(action.service_type.as_deref(), Some(SERVICE));
        assert_eq!(action.arguments, args(&[("newTargetValue", "1")]));
    }

    #[test]
    fn test_parse_action_no_args() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:GetStatus xmlns:u="urn:x"/></s:Body></s:Envelope>"#;
        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "GetStatus");
        assert!(action.arguments.is_empty());
    }

    #[test]
    fn test_prefixed_arguments_and_entities() {
        let xml = r#"<S:Envelope xmlns:S="http://schemas.xmlsoap.org/soap/envelope/"><S:Body><m:Browse xmlns:m="urn:x"><m:Filter>a &amp; b &#60;c&#x3E;</m:Filter><m:Empty/><Data><![CDATA[<raw>]]></Data></m:Browse></S:Body></S:Envelope>"#;
        let action = parse_soap_action(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "Browse");
        assert_eq!(
            action.arguments,
            args(&[("Filter", "a & b <c>"), ("Empty", ""), ("Data", "<raw>")])
        );
    }

    #[test]
    fn test_round_trip_preserves_order() {
        for pairs in [
            vec![],
            vec![("newTargetValue", "foo")],
            vec![("A", "1"), ("B", " two "), ("C", "x&y"), ("D", "")],
        ] {
            let sent = args(&pairs);
            let xml = build_soap_request(SERVICE, "SetTarget", &sent).unwrap();
            let action = parse_soap_action(xml.as_bytes()).unwrap();
            assert_eq!(action.name, "SetTarget");
            assert_eq!(action.service_type.as_deref(), Some(SERVICE));
            assert_eq!(action.arguments, sent);
        }
    }

    #[test]
    fn test_parse_response_strips_suffix() {
        let xml =
            build_soap_response(SERVICE, "GetTarget", &args(&[("RetTargetValue", "foo")])).unwrap();
        let action = parse_soap_response(xml.as_bytes()).unwrap();
        assert_eq!(action.name, "GetTarget");
        assert_eq!(action.argument("RetTargetValue"), Some("foo"));
    }

    #[test]
    fn test_missing_envelope_and_body() {
        assert!(matches!(
            parse_soap_action(b"<root><Body/></root>"),
            Err(SoapError::MissingEnvelope)
        ));
        assert!(matches!(
            parse_soap_action(b"<s:Envelope xmlns:s=\"x\"><s:Header/></s:Envelope>"),
            Err(SoapError::MissingBody)
        ));
        assert!(matches!(
            parse_soap_action(b"<s:Envelope xmlns:s=\"x\"><s:Body>  </s:Body></s:Envelope>"),
            Err(SoapError::NoAction)
        ));
    }

    #[test]
    fn test_fault_round_trip() {
        let xml = build_soap_fault(&UpnpError::new(718, "Conflict & more")).unwrap();
        let err = parse_soap_fault(xml.as_bytes()).unwrap();
        assert_eq!(err, UpnpError::new(718, "Conflict & more"));
    }

    #[test]
    fn test_fault_description_in_cdata() {
        let xml = br#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>
<s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring>
<detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
<errorCode>714</errorCode><errorDescription><![CDATA[No such <entry> & more]]></errorDescription>
</UPnPError></detail></s:Fault>
</s:Body></s:Envelope>"#;
        let err = parse_soap_fault(xml).unwrap();
        assert_eq!(err, UpnpError::new(714, "No such <entry> & more"));
    }

    #[test]
    fn test_parse_fault_rejects_non_fault() {
        let xml = build_soap_response(SERVICE, "GetTarget", &[]).unwrap();
        assert!(matches!(
            parse_soap_fault(xml.as_bytes()),
            Err(SoapError::NotAFault)
        ));
    }
}
