use std::sync::Arc;

use xmltree::Element;

use super::{Action, ActionError, Argument, Direction};
use crate::services::ServiceLink;
use crate::xml::{child_text, children, push_element, push_text};

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Ajoute un argument (builder).
    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.add_argument(argument);
        self
    }

    pub fn add_argument(&mut self, mut argument: Argument) {
        argument.attach(&self.name);
        self.arguments.push(argument);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service propriétaire, si l'action est rattachée.
    pub fn service(&self) -> Option<&ServiceLink> {
        self.service.as_deref()
    }

    pub(crate) fn attach(&mut self, service: Arc<ServiceLink>) {
        self.service = Some(service);
        for argument in &mut self.arguments {
            argument.attach(&self.name);
        }
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn input_arguments(&self) -> Vec<&Argument> {
        self.arguments_in(Direction::In)
    }

    pub fn output_arguments(&self) -> Vec<&Argument> {
        self.arguments_in(Direction::Out)
    }

    fn arguments_in(&self, direction: Direction) -> Vec<&Argument> {
        self.arguments
            .iter()
            .filter(|arg| arg.direction() == direction)
            .collect()
    }

    pub fn argument(&self, name: &str) -> Result<&Argument, ActionError> {
        self.arguments
            .iter()
            .find(|arg| arg.name() == name)
            .ok_or_else(|| ActionError::ArgumentNotFound(name.to_string()))
    }

    pub fn argument_mut(&mut self, name: &str) -> Result<&mut Argument, ActionError> {
        self.arguments
            .iter_mut()
            .find(|arg| arg.name() == name)
            .ok_or_else(|| ActionError::ArgumentNotFound(name.to_string()))
    }

    pub fn set_argument_string(&mut self, name: &str, value: &str) -> Result<(), ActionError> {
        self.argument_mut(name)?.set_string(value);
        Ok(())
    }

    pub fn get_argument_string(&self, name: &str) -> Result<String, ActionError> {
        Ok(self.argument(name)?.get_string().to_string())
    }

    pub fn set_argument_int(&mut self, name: &str, value: i64) -> Result<(), ActionError> {
        self.argument_mut(name)?.set_int(value);
        Ok(())
    }

    pub fn get_argument_int(&self, name: &str) -> Result<i64, ActionError> {
        self.argument(name)?
            .get_int()
            .map_err(|source| invalid_value(name, source))
    }

    pub fn set_argument_float(&mut self, name: &str, value: f64) -> Result<(), ActionError> {
        self.argument_mut(name)?.set_float(value);
        Ok(())
    }

    pub fn get_argument_float(&self, name: &str) -> Result<f64, ActionError> {
        self.argument(name)?
            .get_float()
            .map_err(|source| invalid_value(name, source))
    }

    pub fn set_argument_bool(&mut self, name: &str, value: bool) -> Result<(), ActionError> {
        self.argument_mut(name)?.set_bool(value);
        Ok(())
    }

    pub fn get_argument_bool(&self, name: &str) -> Result<bool, ActionError> {
        self.argument(name)?
            .get_bool()
            .map_err(|source| invalid_value(name, source))
    }

    /// Paires `(nom, valeur)` des arguments d'une direction, dans l'ordre.
    pub(crate) fn argument_values(&self, direction: Direction) -> Vec<(String, String)> {
        self.arguments_in(direction)
            .into_iter()
            .map(|arg| (arg.name().to_string(), arg.value().to_string()))
            .collect()
    }

    /// Recopie des valeurs reçues sur les arguments de même nom.
    ///
    /// Les valeurs sans argument correspondant sont ignorées.
    pub(crate) fn set_argument_values(
        &mut self,
        action_name: &str,
        values: &[(String, String)],
    ) -> Result<(), ActionError> {
        if action_name != self.name {
            return Err(ActionError::NameMismatch {
                expected: self.name.clone(),
                found: action_name.to_string(),
            });
        }

        for (name, value) in values {
            if let Ok(argument) = self.argument_mut(name) {
                argument.set_string(value.as_str());
            }
        }
        Ok(())
    }

    pub(crate) fn from_xml_element(elem: &Element) -> Self {
        let mut action = Action::new(child_text(elem, "name"));
        if let Some(list) = elem.get_child("argumentList") {
            for arg in children(list, "argument") {
                action.add_argument(Argument::from_xml_element(arg));
            }
        }
        action
    }

    pub(crate) fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("action");
        push_text(&mut elem, "name", &self.name);

        if !self.arguments.is_empty() {
            let mut list = Element::new("argumentList");
            for arg in &self.arguments {
                push_element(&mut list, arg.to_xml_element());
            }
            push_element(&mut elem, list);
        }

        elem
    }
}

fn invalid_value(name: &str, source: super::ArgumentValueError) -> ActionError {
    ActionError::InvalidValue {
        name: name.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_target() -> Action {
        Action::new("SetTarget")
            .with_argument(Argument::new("newTargetValue", Direction::In))
            .with_argument(Argument::new("Status", Direction::Out))
            .with_argument(Argument::new("Odd", Direction::Unknown))
    }

    #[test]
    fn test_direction_partition() {
        let action = set_target();
        let inputs: Vec<_> = action.input_arguments().iter().map(|a| a.name()).collect();
        let outputs: Vec<_> = action.output_arguments().iter().map(|a| a.name()).collect();
        assert_eq!(inputs, vec!["newTargetValue"]);
        assert_eq!(outputs, vec!["Status"]);
    }

    #[test]
    fn test_arguments_know_their_action() {
        let action = set_target();
        for arg in action.arguments() {
            assert_eq!(arg.action_name(), Some("SetTarget"));
        }
    }

    #[test]
    fn test_typed_argument_access() {
        let mut action = set_target();
        action.set_argument_bool("newTargetValue", true).unwrap();
        assert_eq!(action.get_argument_string("newTargetValue").unwrap(), "1");
        assert!(action.get_argument_bool("newTargetValue").unwrap());

        action.set_argument_int("Status", 7).unwrap();
        assert_eq!(action.get_argument_int("Status").unwrap(), 7);
        assert_eq!(action.get_argument_float("Status").unwrap(), 7.0);

        assert!(matches!(
            action.set_argument_string("Missing", "x"),
            Err(ActionError::ArgumentNotFound(name)) if name == "Missing"
        ));

        action.set_argument_string("Status", "abc").unwrap();
        assert!(matches!(
            action.get_argument_int("Status"),
            Err(ActionError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_set_argument_values() {
        let mut action = set_target();
        let values = vec![
            ("Status".to_string(), "1".to_string()),
            ("Unknown".to_string(), "ignored".to_string()),
        ];
        action.set_argument_values("SetTarget", &values).unwrap();
        assert_eq!(action.argument("Status").unwrap().value(), "1");
        assert_eq!(action.argument("newTargetValue").unwrap().value(), "");

        assert!(matches!(
            action.set_argument_values("GetTarget", &values),
            Err(ActionError::NameMismatch { .. })
        ));
    }

    #[test]
    fn test_xml_element() {
        let parsed = Action::from_xml_element(&set_target().to_xml_element());
        assert_eq!(parsed.name(), "SetTarget");
        assert_eq!(parsed.arguments().len(), 3);
        assert_eq!(parsed.arguments()[0].name(), "newTargetValue");
        assert!(parsed.arguments()[0].is_in());
        assert_eq!(parsed.arguments()[2].direction(), Direction::Unknown);
    }
}
