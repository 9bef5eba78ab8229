use std::fmt;

use serde::{Deserialize, Serialize};

/// A single reported defect: where it was found and what is wrong.
///
/// Structural violations carry a `systemId:line:column` location; Schematron
/// violations carry whatever the transform wrote into the `location`
/// attribute of its `failed-assert` element (usually an XPath).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    location: String,
    message: String,
}

impl Violation {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "location: {} message: {}", self.location, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let violation = Violation::new("party.xml:12:0", "Element 'x': This element is not expected.");
        assert_eq!(
            violation.to_string(),
            "location: party.xml:12:0 message: Element 'x': This element is not expected."
        );
    }

    #[test]
    fn test_accessors() {
        let violation = Violation::new("/p:responsibleParty/p:role", "bad role");
        assert_eq!(violation.location(), "/p:responsibleParty/p:role");
        assert_eq!(violation.message(), "bad role");
    }

    #[test]
    fn test_empty_fields_still_render() {
        let violation = Violation::new("", "");
        assert_eq!(violation.to_string(), "location:  message: ");
    }

    #[test]
    fn test_json_shape() {
        let violation = Violation::new("a.xml:1:2", "oops");
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["location"], "a.xml:1:2");
        assert_eq!(json["message"], "oops");
    }
}
