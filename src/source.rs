//! XML inputs handed to the validators.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::error::{Result, ValidationError};

/// An XML, schema or transform input.
///
/// The system id doubles as the base URI for relative references and as the
/// file part of diagnostic locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlSource {
    /// Read from disk on every use; the path is the system id.
    File(PathBuf),
    /// In-memory content with an explicit system id.
    Memory { content: Vec<u8>, system_id: String },
}

/// Bytes of a source together with the system id they should be parsed under.
#[derive(Debug)]
pub(crate) struct LoadedSource<'a> {
    pub bytes: Cow<'a, [u8]>,
    pub system_id: String,
}

impl XmlSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        XmlSource::File(path.into())
    }

    pub fn memory(content: impl Into<Vec<u8>>, system_id: impl Into<String>) -> Self {
        XmlSource::Memory {
            content: content.into(),
            system_id: system_id.into(),
        }
    }

    pub fn system_id(&self) -> String {
        match self {
            XmlSource::File(path) => path_to_system_id(path),
            XmlSource::Memory { system_id, .. } => system_id.clone(),
        }
    }

    pub(crate) fn load(&self) -> Result<LoadedSource<'_>> {
        match self {
            XmlSource::File(path) => {
                let bytes = std::fs::read(path).map_err(|source| ValidationError::SourceIo {
                    path: path.clone(),
                    source,
                })?;
                Ok(LoadedSource {
                    bytes: Cow::Owned(bytes),
                    system_id: path_to_system_id(path),
                })
            }
            XmlSource::Memory { content, system_id } => Ok(LoadedSource {
                bytes: Cow::Borrowed(content),
                system_id: system_id.clone(),
            }),
        }
    }
}

impl From<PathBuf> for XmlSource {
    fn from(path: PathBuf) -> Self {
        XmlSource::File(path)
    }
}

impl From<&Path> for XmlSource {
    fn from(path: &Path) -> Self {
        XmlSource::File(path.to_path_buf())
    }
}

fn path_to_system_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_memory_source_keeps_system_id() {
        let source = XmlSource::memory("<root/>", "inline.xml");
        assert_eq!(source.system_id(), "inline.xml");

        let loaded = source.load().unwrap();
        assert_eq!(&*loaded.bytes, b"<root/>");
        assert_eq!(loaded.system_id, "inline.xml");
    }

    #[test]
    fn test_file_source_reads_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"<root/>").unwrap();

        let source = XmlSource::file(file.path());
        let loaded = source.load().unwrap();
        assert_eq!(&*loaded.bytes, b"<root/>");
        assert_eq!(loaded.system_id, file.path().to_string_lossy());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = XmlSource::file("/nonexistent/document.xml");
        match source.load() {
            Err(ValidationError::SourceIo { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/document.xml"))
            }
            other => panic!("Expected SourceIo, got {:?}", other),
        }
    }
}
