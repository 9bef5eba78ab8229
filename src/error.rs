use std::path::PathBuf;

use thiserror::Error;

/// Main library error type.
///
/// Violations found in a document are not errors; they are returned as data.
/// Only failures that make the result unreliable or impossible cross this
/// boundary.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {path} - {source}")]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog could not be loaded: {path}")]
    CatalogLoad { path: PathBuf },

    #[error("Compilation error: {source_name} - {details}")]
    Compilation { source_name: String, details: String },

    #[error("Engine internal error: {details}")]
    EngineInternal { details: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An input (schema, transform, catalog or document) could not be read
    Io,
    /// A schema or transform is malformed or unresolvable
    Compilation,
    /// The engine failed in a way that leaves no reliable result
    EngineInternal,
    /// Invalid configuration
    Config,
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::SourceIo { .. } | ValidationError::CatalogLoad { .. } => {
                ErrorKind::Io
            }
            ValidationError::Compilation { .. } => ErrorKind::Compilation,
            ValidationError::EngineInternal { .. } => ErrorKind::EngineInternal,
            ValidationError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn compilation(source_name: impl Into<String>, details: impl Into<String>) -> Self {
        ValidationError::Compilation {
            source_name: source_name.into(),
            details: details.into(),
        }
    }

    pub(crate) fn engine(details: impl Into<String>) -> Self {
        ValidationError::EngineInternal {
            details: details.into(),
        }
    }
}

/// LibXML2 / libxslt specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Document validation failed with code {code}: {system_id}")]
    ValidationFailed { code: i32, system_id: String },

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,

    #[error("Input too large for libxml2: {size} bytes")]
    InputTooLarge { size: usize },

    #[error("String contains an interior NUL byte: {value}")]
    InteriorNul { value: String },

    #[error("XPath evaluation failed: {expression}")]
    XPathFailed { expression: String },

    #[error("Transform execution failed: {system_id}")]
    TransformFailed { system_id: String },
}

impl From<LibXml2Error> for ValidationError {
    fn from(err: LibXml2Error) -> Self {
        ValidationError::EngineInternal {
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let io_error = ValidationError::SourceIo {
            path: PathBuf::from("party.xml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
        };
        assert!(io_error.to_string().contains("IO error"));
        assert!(io_error.to_string().contains("party.xml"));

        let compilation = ValidationError::Compilation {
            source_name: "gmd.xsd".to_string(),
            details: "Failed to locate the main schema resource".to_string(),
        };
        assert!(compilation.to_string().contains("Compilation error"));
        assert!(compilation.to_string().contains("gmd.xsd"));
        assert!(compilation.to_string().contains("main schema resource"));

        let catalog = ValidationError::CatalogLoad {
            path: PathBuf::from("/etc/catalog.xml"),
        };
        assert!(catalog.to_string().contains("/etc/catalog.xml"));
    }

    #[test]
    fn test_error_kinds() {
        let source_io = ValidationError::SourceIo {
            path: PathBuf::from("missing.xml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(source_io.kind(), ErrorKind::Io);
        assert_eq!(
            ValidationError::CatalogLoad {
                path: PathBuf::from("c.xml")
            }
            .kind(),
            ErrorKind::Io
        );
        assert_eq!(
            ValidationError::compilation("a.xsd", "bad").kind(),
            ErrorKind::Compilation
        );
        assert_eq!(
            ValidationError::engine("boom").kind(),
            ErrorKind::EngineInternal
        );
        assert_eq!(
            ValidationError::Config("x".to_string()).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_libxml2_error_display() {
        let parse_failed = LibXml2Error::SchemaParseFailed;
        assert!(parse_failed.to_string().contains("Schema parsing failed"));

        let validation_failed = LibXml2Error::ValidationFailed {
            code: -1,
            system_id: "test.xml".to_string(),
        };
        assert!(validation_failed.to_string().contains("-1"));
        assert!(validation_failed.to_string().contains("test.xml"));

        let xpath = LibXml2Error::XPathFailed {
            expression: "//*[".to_string(),
        };
        assert!(xpath.to_string().contains("//*["));
    }

    #[test]
    fn test_libxml2_error_conversion() {
        let validation_error: ValidationError = LibXml2Error::MemoryAllocation.into();

        match validation_error {
            ValidationError::EngineInternal { details } => {
                assert!(details.contains("Memory allocation failed"))
            }
            other => panic!("Expected EngineInternal, got {:?}", other),
        }
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let validation_error = ValidationError::SourceIo {
            path: PathBuf::from("doc.xml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
        };

        let source = validation_error.source().unwrap();
        assert_eq!(source.to_string(), "File not found");
    }
}
