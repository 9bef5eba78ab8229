//! Schematron validation
//!
//! Schematron rules arrive already compiled to an XSLT transform that emits
//! SVRL. Each call compiles the transform, runs it over the document into an
//! in-memory result tree and turns every `failed-assert` in that tree into a
//! [`Violation`]. Nothing compiled survives the call.

use std::path::{Path, PathBuf};

use crate::catalog::XmlCatalog;
use crate::diagnostics::DiagnosticCollector;
use crate::error::{LibXml2Error, Result, ValidationError};
use crate::libxml2::{ErrorCapture, LibXml2Wrapper, Stylesheet, XmlDocument};
use crate::loader::{Resolution, ResolutionScope};
use crate::source::XmlSource;
use crate::validator::Validator;
use crate::violation::Violation;

/// Failed assertions in the transform output, in document order.
const FAILED_ASSERTS: &str = "//*[local-name()='failed-assert']";

/// Validates documents with a compiled Schematron transform.
#[derive(Debug, Clone)]
pub struct SchematronValidator {
    transform: XmlSource,
    catalog: Option<PathBuf>,
}

impl SchematronValidator {
    /// Store the transform and optional catalog. Nothing is read or compiled
    /// until [`Validator::validate`] runs.
    pub fn new(transform: XmlSource, catalog: Option<&Path>) -> Self {
        SchematronValidator {
            transform,
            catalog: catalog.map(Path::to_path_buf),
        }
    }

    pub fn transform(&self) -> &XmlSource {
        &self.transform
    }

    /// Extract violations from an SVRL result tree.
    fn failed_asserts(report: &XmlDocument) -> Result<Vec<Violation>> {
        let xpath = report.xpath()?;
        let mut violations = Vec::new();
        for node in xpath.select_nodes(FAILED_ASSERTS)? {
            let location = xpath.eval_string(Some(node), "string(@location)")?;
            let message = xpath.eval_string(Some(node), "string(.)")?;
            violations.push(Violation::new(location, message));
        }
        Ok(violations)
    }
}

impl Validator for SchematronValidator {
    fn validate(&self, xml: &XmlSource) -> Result<Vec<Violation>> {
        LibXml2Wrapper::new();

        let transform = self.transform.load()?;
        let catalog = self.catalog.as_deref().map(XmlCatalog::load).transpose()?;
        let _scope = catalog.map(|catalog| ResolutionScope::enter(Resolution::Catalog(catalog)));

        let mut collector = DiagnosticCollector::new(&transform.system_id);
        let stylesheet = {
            let _capture = ErrorCapture::install(&mut collector);
            XmlDocument::parse(&transform.bytes, &transform.system_id)?.and_then(Stylesheet::compile)
        };
        let Some(stylesheet) = stylesheet else {
            return Err(ValidationError::compilation(
                &transform.system_id,
                collector.summary(),
            ));
        };

        let input = xml.load()?;
        let mut collector = DiagnosticCollector::new(&input.system_id);
        let report = {
            let capture = ErrorCapture::install(&mut collector);
            let Some(doc) = XmlDocument::parse(&input.bytes, &input.system_id)? else {
                drop(capture);
                return Err(ValidationError::engine(format!(
                    "Document could not be parsed: {}",
                    collector.summary()
                )));
            };
            stylesheet.apply(&doc)
        };
        let Some(report) = report else {
            return Err(LibXml2Error::TransformFailed {
                system_id: input.system_id,
            }
            .into());
        };

        let violations = Self::failed_asserts(&report)?;
        tracing::debug!(
            document = %input.system_id,
            transform = %transform.system_id,
            failed_asserts = violations.len(),
            "Schematron validation finished"
        );
        Ok(violations)
    }
}
