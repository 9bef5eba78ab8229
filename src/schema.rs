//! XML Schema validation
//!
//! A [`SchemaValidator`] compiles its schema once and then validates any
//! number of documents, from any number of threads.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::catalog::{CatalogRequest, CatalogResolver, ResourceType, XML_SCHEMA_NS, XmlCatalog, is_remote};
use crate::diagnostics::DiagnosticCollector;
use crate::error::{LibXml2Error, Result, ValidationError};
use crate::libxml2::{ErrorCapture, LibXml2Wrapper, ValidationResult, XmlDocument, XmlSchemaPtr, build_uri};
use crate::loader::{Resolution, ResolutionScope};
use crate::source::XmlSource;
use crate::validator::Validator;
use crate::violation::Violation;

/// Composition elements that pull another schema document in.
const SCHEMA_REFERENCES: &str = "/xs:schema/xs:include | /xs:schema/xs:import | /xs:schema/xs:redefine";

/// A schema document reference found in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReference {
    /// Namespace the referenced document contributes to
    pub namespace: String,
    /// `schemaLocation` exactly as written
    pub location: String,
}

/// List the include/import/redefine references of a parsed schema document.
///
/// Imports carry their own `namespace`; includes and redefines take the
/// including schema's target namespace. References without a
/// `schemaLocation` are skipped.
pub fn schema_references(doc: &XmlDocument) -> Result<Vec<SchemaReference>> {
    let xpath = doc.xpath()?;
    xpath.register_namespace("xs", XML_SCHEMA_NS)?;

    let target_namespace = xpath.eval_string(None, "string(/xs:schema/@targetNamespace)")?;

    let mut references = Vec::new();
    for node in xpath.select_nodes(SCHEMA_REFERENCES)? {
        let location = xpath.eval_string(Some(node), "string(@schemaLocation)")?;
        if location.is_empty() {
            continue;
        }
        let namespace = if xpath.eval_string(Some(node), "local-name()")? == "import" {
            xpath.eval_string(Some(node), "string(@namespace)")?
        } else {
            target_namespace.clone()
        };
        references.push(SchemaReference { namespace, location });
    }
    Ok(references)
}

/// Walk the schema's composition graph and work out which absolute URLs
/// libxml2 will request should instead load a catalog-resolved resource.
///
/// Keys are built the way libxml2 builds them: `schemaLocation` resolved
/// against the referencing document's URL. Resolved targets are crawled at
/// their resolved location, so nested relative references line up with what
/// libxml2 sees after the redirect. The first resolution for a URL wins.
fn plan_redirects(catalog: &XmlCatalog, root: &[u8], root_url: &str) -> Result<HashMap<String, String>> {
    let resolver = CatalogResolver::new(catalog);
    let mut redirects = HashMap::new();

    // Problems here resurface during compilation, where they are reported
    let mut scratch = DiagnosticCollector::new(root_url);
    let _capture = ErrorCapture::install(&mut scratch);

    let Some(root_doc) = XmlDocument::parse(root, root_url)? else {
        return Ok(redirects);
    };

    let mut visited = HashSet::from([root_url.to_string()]);
    let mut pending = vec![(root_doc, root_url.to_string())];

    while let Some((doc, base)) = pending.pop() {
        for reference in schema_references(&doc)? {
            let request = CatalogRequest {
                resource_type: ResourceType::Schema,
                namespace_uri: &reference.namespace,
                public_id: None,
                system_id: &reference.location,
                base_uri: Some(&base),
            };
            let absolute = build_uri(&reference.location, &base)?.unwrap_or_else(|| reference.location.clone());

            let next = match resolver.resolve(&request) {
                Some(resolved) => redirects.entry(absolute).or_insert(resolved.uri).clone(),
                // Unresolved remote references are left to libxml2
                None if is_remote(&absolute) => continue,
                None => absolute,
            };

            if visited.insert(next.clone()) {
                if let Some(next_doc) = XmlDocument::read(&next)? {
                    pending.push((next_doc, next));
                }
            }
        }
    }

    tracing::debug!(
        schema = root_url,
        redirects = redirects.len(),
        documents = visited.len(),
        "Planned schema redirects"
    );
    Ok(redirects)
}

/// Validates documents against one compiled XML Schema.
///
/// The compiled schema is read-only and shared by every call; all other
/// state lives for the duration of a single `validate`. Clones share the
/// compiled schema instead of compiling it again.
#[derive(Clone)]
pub struct SchemaValidator {
    wrapper: LibXml2Wrapper,
    schema: XmlSchemaPtr,
    schema_id: String,
}

impl SchemaValidator {
    /// Compile `schema`, resolving its includes and imports through the
    /// catalog at `catalog` when one is given.
    pub fn new(schema: &XmlSource, catalog: Option<&Path>) -> Result<Self> {
        let wrapper = LibXml2Wrapper::new();
        let loaded = schema.load()?;

        let redirects = match catalog {
            Some(path) => {
                let catalog = XmlCatalog::load(path)?;
                Some(plan_redirects(&catalog, &loaded.bytes, &loaded.system_id)?)
            }
            None => None,
        };

        let mut collector = DiagnosticCollector::new(&loaded.system_id);
        let compiled = {
            let capture = ErrorCapture::install(&mut collector);
            let _scope = redirects.map(|table| ResolutionScope::enter(Resolution::Redirects(table)));

            match XmlDocument::parse(&loaded.bytes, &loaded.system_id)? {
                None => None,
                Some(doc) => match wrapper.parse_schema(doc, &capture) {
                    Ok(schema) => Some(schema),
                    Err(LibXml2Error::SchemaParseFailed) => None,
                    Err(err) => return Err(err.into()),
                },
            }
        };

        let Some(compiled) = compiled else {
            return Err(ValidationError::compilation(
                &loaded.system_id,
                collector.summary(),
            ));
        };

        tracing::debug!(schema = %loaded.system_id, "Compiled schema");
        Ok(SchemaValidator {
            wrapper,
            schema: compiled,
            schema_id: loaded.system_id,
        })
    }

    /// System id of the schema this validator was compiled from.
    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, xml: &XmlSource) -> Result<Vec<Violation>> {
        let loaded = xml.load()?;
        let mut collector = DiagnosticCollector::new(&loaded.system_id);

        let outcome = {
            let capture = ErrorCapture::install(&mut collector);
            self.wrapper
                .validate_stream(&self.schema, &loaded.bytes, &loaded.system_id, &capture)?
        };

        match outcome {
            // The parser gave up; what it reported is already in the collector
            ValidationResult::InternalError { .. } if collector.has_fatal() => {
                tracing::debug!(document = %loaded.system_id, "Parse aborted on fatal error");
                Ok(collector.into_violations())
            }
            ValidationResult::InternalError { code } => Err(LibXml2Error::ValidationFailed {
                code,
                system_id: loaded.system_id,
            }
            .into()),
            ValidationResult::Valid | ValidationResult::Invalid { .. } => {
                Ok(collector.into_violations())
            }
        }
    }
}
