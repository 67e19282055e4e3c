//! Variables d'état déclarées dans la `serviceStateTable` d'un SCPD.
//!
//! Les valeurs sont conservées telles qu'écrites dans la description :
//! le moteur ne les interprète pas.

use xmltree::Element;

use crate::xml::{child_text, children, push_element, push_opt_text, push_text};

/// Bornes `allowedValueRange` d'une variable numérique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedValueRange {
    pub minimum: String,
    pub maximum: String,
    pub step: String,
}

impl AllowedValueRange {
    pub fn new(minimum: impl Into<String>, maximum: impl Into<String>) -> Self {
        Self {
            minimum: minimum.into(),
            maximum: maximum.into(),
            step: String::new(),
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = step.into();
        self
    }

    fn is_empty(&self) -> bool {
        self.minimum.is_empty() && self.maximum.is_empty() && self.step.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateVariable {
    pub name: String,
    pub data_type: String,
    pub default_value: String,
    pub allowed_values: Vec<String>,
    pub allowed_value_range: Option<AllowedValueRange>,
    /// Attribut `sendEvents` (`yes` / `no`), vide si absent
    pub send_events: String,
    /// Attribut `multicast`, vide si absent
    pub multicast: String,
}

impl StateVariable {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Default::default()
        }
    }

    pub fn with_send_events(mut self, send_events: bool) -> Self {
        self.send_events = if send_events { "yes" } else { "no" }.to_string();
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allowed_value_range(mut self, range: AllowedValueRange) -> Self {
        self.allowed_value_range = Some(range);
        self
    }

    pub fn sends_events(&self) -> bool {
        self.send_events.eq_ignore_ascii_case("yes")
    }

    pub(crate) fn from_xml_element(elem: &Element) -> Self {
        let allowed_values = elem
            .get_child("allowedValueList")
            .map(|list| {
                children(list, "allowedValue")
                    .filter_map(|value| value.get_text())
                    .map(|text| text.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let allowed_value_range = elem
            .get_child("allowedValueRange")
            .map(|range| AllowedValueRange {
                minimum: child_text(range, "minimum"),
                maximum: child_text(range, "maximum"),
                step: child_text(range, "step"),
            });

        Self {
            name: child_text(elem, "name"),
            data_type: child_text(elem, "dataType"),
            default_value: child_text(elem, "defaultValue"),
            allowed_values,
            allowed_value_range,
            send_events: elem.attributes.get("sendEvents").cloned().unwrap_or_default(),
            multicast: elem.attributes.get("multicast").cloned().unwrap_or_default(),
        }
    }

    pub(crate) fn to_xml_element(&self) -> Element {
        let mut root = Element::new("stateVariable");
        if !self.send_events.is_empty() {
            root.attributes
                .insert("sendEvents".to_string(), self.send_events.clone());
        }
        if !self.multicast.is_empty() {
            root.attributes
                .insert("multicast".to_string(), self.multicast.clone());
        }

        push_text(&mut root, "name", &self.name);
        push_text(&mut root, "dataType", &self.data_type);
        push_opt_text(&mut root, "defaultValue", &self.default_value);

        if !self.allowed_values.is_empty() {
            let mut list = Element::new("allowedValueList");
            for value in &self.allowed_values {
                push_text(&mut list, "allowedValue", value);
            }
            push_element(&mut root, list);
        }

        if let Some(range) = self.allowed_value_range.as_ref().filter(|r| !r.is_empty()) {
            let mut range_elem = Element::new("allowedValueRange");
            push_text(&mut range_elem, "minimum", &range.minimum);
            push_text(&mut range_elem, "maximum", &range.maximum);
            push_opt_text(&mut range_elem, "step", &range.step);
            push_element(&mut root, range_elem);
        }

        root
    }
}
