//! # xml-schemer Library
//!
//! Validate XML documents against XML Schema or against Schematron rules
//! compiled to XSLT, collecting every violation rather than stopping at the
//! first. Cross-references inside schemas and transforms can be resolved
//! through an OASIS XML catalog.
//!
//! ```no_run
//! use xml_schemer::{SchemaValidator, Validator, XmlSource};
//!
//! let validator = SchemaValidator::new(&XmlSource::file("gmd.xsd"), None)?;
//! for violation in validator.validate(&XmlSource::file("party.xml"))? {
//!     eprintln!("{}", violation);
//! }
//! # Ok::<(), xml_schemer::ValidationError>(())
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod libxml2;
pub mod logging;
pub mod output;
pub mod schema;
pub mod schematron;
pub mod source;
pub mod validator;
pub mod violation;

mod loader;

pub use catalog::{CatalogLookup, CatalogRequest, CatalogResolver, ResolvedResource, ResourceType, XmlCatalog};
pub use cli::{Cli, OutputFormat};
pub use config::{Config, ConfigError, ConfigManager};
pub use diagnostics::{DiagnosticCollector, DiagnosticEvent, Severity};
pub use error::{ErrorKind, Result, ValidationError};
pub use libxml2::LibXml2Wrapper;
pub use output::Output;
pub use schema::SchemaValidator;
pub use schematron::SchematronValidator;
pub use source::XmlSource;
pub use validator::Validator;
pub use violation::Violation;
