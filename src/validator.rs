//! The validation contract shared by schema and Schematron validation.

use crate::error::Result;
use crate::source::XmlSource;
use crate::violation::Violation;

/// Something that checks an XML document and reports what is wrong with it.
///
/// Violations are data: an empty vector means the document passed. Errors
/// are reserved for failures that leave no reliable result, such as an
/// unreadable source.
pub trait Validator {
    fn validate(&self, xml: &XmlSource) -> Result<Vec<Violation>>;
}

impl<V: Validator + ?Sized> Validator for Box<V> {
    fn validate(&self, xml: &XmlSource) -> Result<Vec<Violation>> {
        (**self).validate(xml)
    }
}
