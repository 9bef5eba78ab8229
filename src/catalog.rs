//! OASIS catalog resolution
//!
//! Resolution is a pure function of a [`CatalogRequest`] and the catalog's
//! own lookup table. The one twist is the local-include heuristic: a request
//! without a public id whose system id is not a remote URL is matched as
//! `namespaceURI + "/" + systemId`, so a single catalog entry covers every
//! same-namespace include no matter which file pulls it in.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::ptr;

use crate::error::{Result, ValidationError};
use crate::libxml2::{
    LibXml2Wrapper, XmlCatalog as RawCatalog, XmlChar, c_string, take_xml_string, xmlACatalogResolvePublic,
    xmlACatalogResolveSystem, xmlACatalogResolveURI, xmlFreeCatalog, xmlLoadACatalog,
};

/// Scheme prefixes treated as absolute remote references.
const REMOTE_SCHEMES: [&str; 2] = ["http://", "https://"];

/// W3C XML Schema namespace, used as the resource type of schema requests.
pub const XML_SCHEMA_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Kind of resource an engine is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// An `xs:include`, `xs:import` or `xs:redefine` target
    Schema,
    /// Anything else dereferenced by URI, e.g. a `document()` call
    Document,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Schema => XML_SCHEMA_NS,
            ResourceType::Document => "document",
        }
    }
}

/// One resolution attempt. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest<'a> {
    pub resource_type: ResourceType,
    /// Empty for no-namespace schemas
    pub namespace_uri: &'a str,
    pub public_id: Option<&'a str>,
    pub system_id: &'a str,
    pub base_uri: Option<&'a str>,
}

/// A local resource the catalog mapped the request to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub uri: String,
}

/// Literal entry matching, as provided by an OASIS catalog.
pub trait CatalogLookup {
    fn match_public(&self, public_id: &str) -> Option<String>;
    fn match_system(&self, system_id: &str) -> Option<String>;
    fn match_uri(&self, uri: &str) -> Option<String>;
}

pub fn is_remote(system_id: &str) -> bool {
    REMOTE_SCHEMES
        .iter()
        .any(|scheme| system_id.starts_with(scheme))
}

/// The system id actually looked up for `request`.
pub fn effective_system_id<'a>(request: &CatalogRequest<'a>) -> Cow<'a, str> {
    if request.public_id.is_none() && !is_remote(request.system_id) {
        Cow::Owned(format!("{}/{}", request.namespace_uri, request.system_id))
    } else {
        Cow::Borrowed(request.system_id)
    }
}

/// Applies the resolution rules on top of a [`CatalogLookup`].
pub struct CatalogResolver<'c, C: CatalogLookup + ?Sized> {
    catalog: &'c C,
}

impl<'c, C: CatalogLookup + ?Sized> CatalogResolver<'c, C> {
    pub fn new(catalog: &'c C) -> Self {
        Self { catalog }
    }

    /// Resolve a schema-style request: public match first, then system match
    /// on the (possibly rewritten) system id.
    pub fn resolve(&self, request: &CatalogRequest<'_>) -> Option<ResolvedResource> {
        let system_id = effective_system_id(request);
        if system_id != request.system_id {
            tracing::trace!(
                original = request.system_id,
                rewritten = %system_id,
                "Rewrote local include for catalog lookup"
            );
        }

        let resolved = request
            .public_id
            .and_then(|public_id| self.catalog.match_public(public_id))
            .or_else(|| self.catalog.match_system(&system_id));

        match &resolved {
            Some(uri) => tracing::debug!(
                resource_type = request.resource_type.as_str(),
                system_id = %system_id,
                resolved = %uri,
                "Catalog resolved resource"
            ),
            None => tracing::debug!(
                resource_type = request.resource_type.as_str(),
                system_id = %system_id,
                base_uri = request.base_uri.unwrap_or(""),
                "Catalog left resource unresolved"
            ),
        }

        resolved.map(|uri| ResolvedResource { uri })
    }

    /// Resolve a plain URI reference, as a transform dereferences it:
    /// public match when a public id is given, then uri and system entries.
    /// No rewriting applies here.
    pub fn resolve_uri(&self, uri: &str, public_id: Option<&str>) -> Option<ResolvedResource> {
        public_id
            .and_then(|public_id| self.catalog.match_public(public_id))
            .or_else(|| self.catalog.match_uri(uri))
            .or_else(|| self.catalog.match_system(uri))
            .map(|uri| ResolvedResource { uri })
    }
}

/// An OASIS XML catalog loaded through libxml2.
///
/// Not `Send`: libxml2 catalogs load delegated catalogs lazily, so a loaded
/// catalog stays on the thread that uses it.
#[derive(Debug)]
pub struct XmlCatalog {
    ptr: *mut RawCatalog,
    path: PathBuf,
}

impl XmlCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        LibXml2Wrapper::new();

        let catalog_load = || ValidationError::CatalogLoad {
            path: path.to_path_buf(),
        };
        let c_path = c_string(&path.to_string_lossy()).map_err(|_| catalog_load())?;
        let ptr = unsafe { xmlLoadACatalog(c_path.as_ptr()) };
        if ptr.is_null() {
            return Err(catalog_load());
        }

        tracing::debug!(catalog = %path.display(), "Loaded catalog");
        Ok(XmlCatalog {
            ptr,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lookup(
        &self,
        value: &str,
        resolve: unsafe extern "C" fn(*mut RawCatalog, *const XmlChar) -> *mut XmlChar,
    ) -> Option<String> {
        let c_value = c_string(value).ok()?;
        unsafe { take_xml_string(resolve(self.ptr, c_value.as_ptr() as *const XmlChar)) }
    }
}

impl CatalogLookup for XmlCatalog {
    fn match_public(&self, public_id: &str) -> Option<String> {
        self.lookup(public_id, xmlACatalogResolvePublic)
    }

    fn match_system(&self, system_id: &str) -> Option<String> {
        self.lookup(system_id, xmlACatalogResolveSystem)
    }

    fn match_uri(&self, uri: &str) -> Option<String> {
        self.lookup(uri, xmlACatalogResolveURI)
    }
}

impl Drop for XmlCatalog {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xmlFreeCatalog(self.ptr) };
            self.ptr = ptr::null_mut();
        }
    }
}
