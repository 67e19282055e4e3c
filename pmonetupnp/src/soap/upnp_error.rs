//! Erreurs UPnP structurées (code + description).

use thiserror::Error;

/// Codes d'erreur UPnP standards
pub mod codes {
    pub const INVALID_ACTION: u32 = 401;
    pub const INVALID_ARGS: u32 = 402;
    pub const ACTION_FAILED: u32 = 501;
    pub const ARGUMENT_VALUE_INVALID: u32 = 600;
    pub const ARGUMENT_VALUE_OUT_OF_RANGE: u32 = 601;
    pub const OPTIONAL_ACTION_NOT_IMPLEMENTED: u32 = 602;
    pub const OUT_OF_MEMORY: u32 = 603;
    pub const HUMAN_INTERVENTION_REQUIRED: u32 = 604;
    pub const STRING_ARGUMENT_TOO_LONG: u32 = 605;
}

/// Description standard d'un code d'erreur UPnP, vide s'il est inconnu.
pub fn error_code_description(code: u32) -> &'static str {
    match code {
        codes::INVALID_ACTION => "Invalid Action",
        codes::INVALID_ARGS => "Invalid Args",
        codes::ACTION_FAILED => "Action Failed",
        codes::ARGUMENT_VALUE_INVALID => "Argument Value Invalid",
        codes::ARGUMENT_VALUE_OUT_OF_RANGE => "Argument Value Out of Range",
        codes::OPTIONAL_ACTION_NOT_IMPLEMENTED => "Optional Action Not Implemented",
        codes::OUT_OF_MEMORY => "Out of Memory",
        codes::HUMAN_INTERVENTION_REQUIRED => "Human Intervention Required",
        codes::STRING_ARGUMENT_TOO_LONG => "String Argument Too Long",
        _ => "",
    }
}

/// Erreur UPnP transportée dans un SOAP fault.
///
/// C'est à la fois ce que retourne un device distant qui rejette une
/// action et ce que retourne un callback d'action côté device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("UPnP Error : [{code}] {description}")]
pub struct UpnpError {
    pub code: u32,
    pub description: String,
}

impl UpnpError {
    /// Code et description libres.
    pub fn new(code: u32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    /// Description tirée de la table des codes standards.
    pub fn from_code(code: u32) -> Self {
        Self::new(code, error_code_description(code))
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_uses_table() {
        let err = UpnpError::from_code(codes::OPTIONAL_ACTION_NOT_IMPLEMENTED);
        assert_eq!(err.description(), "Optional Action Not Implemented");
        assert_eq!(err.to_string(), "UPnP Error : [602] Optional Action Not Implemented");
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(UpnpError::from_code(799).description(), "");
        let custom = UpnpError::new(799, "Vendor Failure");
        assert_eq!(custom.code(), 799);
        assert_eq!(custom.description(), "Vendor Failure");
    }

    #[test]
    fn test_table_is_complete() {
        for code in [401, 402, 501, 600, 601, 602, 603, 604, 605] {
            assert!(!error_code_description(code).is_empty(), "code {}", code);
        }
    }
}
