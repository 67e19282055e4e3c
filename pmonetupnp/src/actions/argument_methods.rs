//! Accesseurs typés des arguments.
//!
//! Les accès entier, flottant et booléen sont des coercitions de la
//! valeur textuelle. Un booléen s'écrit `"1"` / `"0"`.

use std::fmt;
use std::str::FromStr;

use xmltree::Element;

use super::{Argument, ArgumentValueError, DIRECTION_IN, DIRECTION_OUT, Direction};
use crate::xml::{child_text, push_text};

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => DIRECTION_IN,
            Direction::Out => DIRECTION_OUT,
            Direction::Unknown => "",
        }
    }
}

impl FromStr for Direction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            DIRECTION_IN => Direction::In,
            DIRECTION_OUT => Direction::Out,
            _ => Direction::Unknown,
        })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lecture booléenne : `1 t T TRUE true True` et leurs négations.
pub fn parse_bool(value: &str) -> Result<bool, ArgumentValueError> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(ArgumentValueError::Bool(other.to_string())),
    }
}

impl Argument {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            ..Default::default()
        }
    }

    pub fn with_related_state_variable(mut self, variable: impl Into<String>) -> Self {
        self.related_state_variable = variable.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_in(&self) -> bool {
        self.direction == Direction::In
    }

    pub fn is_out(&self) -> bool {
        self.direction == Direction::Out
    }

    pub fn related_state_variable(&self) -> &str {
        &self.related_state_variable
    }

    /// Nom de l'action propriétaire.
    pub fn action_name(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub(crate) fn attach(&mut self, action: &str) {
        self.action = Some(action.to_string());
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_string(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn get_string(&self) -> &str {
        &self.value
    }

    pub fn set_int(&mut self, value: i64) {
        self.value = value.to_string();
    }

    pub fn get_int(&self) -> Result<i64, ArgumentValueError> {
        Ok(self.value.parse::<i64>()?)
    }

    pub fn set_float(&mut self, value: f64) {
        self.value = value.to_string();
    }

    pub fn get_float(&self) -> Result<f64, ArgumentValueError> {
        Ok(self.value.parse::<f64>()?)
    }

    pub fn set_bool(&mut self, value: bool) {
        self.set_int(if value { 1 } else { 0 });
    }

    pub fn get_bool(&self) -> Result<bool, ArgumentValueError> {
        parse_bool(&self.value)
    }

    pub(crate) fn from_xml_element(elem: &Element) -> Self {
        Self {
            name: child_text(elem, "name"),
            direction: child_text(elem, "direction")
                .parse()
                .unwrap_or_default(),
            related_state_variable: child_text(elem, "relatedStateVariable"),
            ..Default::default()
        }
    }

    pub(crate) fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("argument");
        push_text(&mut elem, "name", &self.name);
        push_text(&mut elem, "direction", self.direction.as_str());
        push_text(&mut elem, "relatedStateVariable", &self.related_state_variable);
        elem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_encoded_as_digit() {
        let mut arg = Argument::new("newTargetValue", Direction::In);
        arg.set_bool(true);
        assert_eq!(arg.value(), "1");
        assert!(arg.get_bool().unwrap());

        arg.set_bool(false);
        assert_eq!(arg.value(), "0");
        assert!(!arg.get_bool().unwrap());
    }

    #[test]
    fn test_parse_bool_accepts_textual_forms() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(v), Ok(true), "{}", v);
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(v), Ok(false), "{}", v);
        }
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("tRUE").is_err());
    }

    #[test]
    fn test_int_and_float_coercion() {
        let mut arg = Argument::new("Volume", Direction::Out);
        arg.set_int(-42);
        assert_eq!(arg.get_int().unwrap(), -42);
        arg.set_float(1.5);
        assert_eq!(arg.value(), "1.5");
        assert_eq!(arg.get_float().unwrap(), 1.5);
        arg.set_string("abc");
        assert!(matches!(arg.get_int(), Err(ArgumentValueError::Int(_))));
        assert!(matches!(arg.get_float(), Err(ArgumentValueError::Float(_))));
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!(" out ".parse::<Direction>().unwrap(), Direction::Out);
        assert_eq!("inout".parse::<Direction>().unwrap(), Direction::Unknown);
        assert_eq!(Direction::Out as i32, 2);
    }

    #[test]
    fn test_xml_element() {
        let arg = Argument::new("RetTargetValue", Direction::Out)
            .with_related_state_variable("Target");
        let parsed = Argument::from_xml_element(&arg.to_xml_element());
        assert_eq!(parsed.name(), "RetTargetValue");
        assert!(parsed.is_out());
        assert_eq!(parsed.related_state_variable(), "Target");
    }
}
