//! Petits utilitaires `xmltree` partagés par les descriptions.

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::devices::DescriptionError;

/// Texte d'un enfant direct, vide s'il est absent.
pub(crate) fn child_text(elem: &Element, name: &str) -> String {
    elem.get_child(name)
        .and_then(|child| child.get_text())
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

/// Enfants directs portant le nom `name`.
pub(crate) fn children<'a>(elem: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    elem.children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter(move |child| child.name == name)
}

pub(crate) fn text_element(name: &str, value: &str) -> Element {
    let mut elem = Element::new(name);
    if !value.is_empty() {
        elem.children.push(XMLNode::Text(value.to_string()));
    }
    elem
}

/// Ajoute `<name>value</name>` à `parent`.
pub(crate) fn push_text(parent: &mut Element, name: &str, value: &str) {
    parent
        .children
        .push(XMLNode::Element(text_element(name, value)));
}

/// Ajoute `<name>value</name>` seulement si `value` est non vide.
pub(crate) fn push_opt_text(parent: &mut Element, name: &str, value: &str) {
    if !value.is_empty() {
        push_text(parent, name, value);
    }
}

pub(crate) fn push_element(parent: &mut Element, child: Element) {
    parent.children.push(XMLNode::Element(child));
}

/// Sérialise un document avec déclaration XML et indentation.
pub(crate) fn write_document(root: &Element) -> Result<String, DescriptionError> {
    let config = EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");

    let mut buf = Vec::new();
    root.write_with_config(&mut buf, config)?;
    Ok(String::from_utf8(buf)?)
}

/// Parse un document et vérifie le nom de l'élément racine.
pub(crate) fn parse_document(bytes: &[u8], expected: &'static str) -> Result<Element, DescriptionError> {
    let root = Element::parse(bytes)?;
    if root.name != expected {
        return Err(DescriptionError::UnexpectedRoot {
            expected,
            found: root.name,
        });
    }
    Ok(root)
}
