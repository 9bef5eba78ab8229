//! Catalog-aware external entity loading
//!
//! libxml2 fetches every `xs:include`, `xs:import` and XSLT `document()`
//! target through one process-wide external entity loader. That hook only
//! sees the absolute URL, so the loader installed here consults a
//! thread-local [`ResolutionScope`] set up by whichever validator is running
//! on the current thread, and otherwise defers to libxml2's default loader.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::ptr;
use std::sync::OnceLock;

use libc::c_char;

use crate::catalog::{CatalogResolver, XmlCatalog};
use crate::libxml2::{
    XmlExternalEntityLoader, XmlParserCtxt, XmlParserInput, xmlGetExternalEntityLoader, xmlSetExternalEntityLoader,
};

/// libxml2's own loader, captured before ours replaces it.
static DEFAULT_LOADER: OnceLock<XmlExternalEntityLoader> = OnceLock::new();

thread_local! {
    static ACTIVE: RefCell<Option<Resolution>> = const { RefCell::new(None) };
}

/// How to redirect entity loads on the current thread.
pub(crate) enum Resolution {
    /// Absolute URL as libxml2 computes it -> catalog-resolved URI.
    Redirects(HashMap<String, String>),
    /// Look every URL up in a catalog.
    Catalog(XmlCatalog),
}

impl Resolution {
    fn redirect(&self, url: &str, public_id: Option<&str>) -> Option<String> {
        match self {
            Resolution::Redirects(table) => table.get(url).cloned(),
            Resolution::Catalog(catalog) => CatalogResolver::new(catalog)
                .resolve_uri(url, public_id)
                .map(|resolved| resolved.uri),
        }
    }
}

/// Keeps a [`Resolution`] active on this thread until dropped.
pub(crate) struct ResolutionScope {
    previous: Option<Resolution>,
    // Tied to the thread whose thread-local it modified
    _not_send: PhantomData<*const ()>,
}

impl ResolutionScope {
    pub(crate) fn enter(resolution: Resolution) -> Self {
        let previous = ACTIVE.with(|active| active.replace(Some(resolution)));
        ResolutionScope {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ResolutionScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| {
            active.replace(previous);
        });
    }
}

/// Install the catalog-aware loader. Must run once, during engine initialization.
pub(crate) fn install() {
    unsafe {
        let _ = DEFAULT_LOADER.set(xmlGetExternalEntityLoader());
        xmlSetExternalEntityLoader(Some(catalog_entity_loader));
    }
}

fn c_str<'a>(value: *const c_char) -> Option<&'a str> {
    if value.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(value) }.to_str().ok()
}

/// Look `url` up in the scope active on this thread, if any.
fn redirect(url: &str, public_id: Option<&str>) -> Option<String> {
    ACTIVE.with(|active| {
        active
            .try_borrow()
            .ok()
            .and_then(|active| active.as_ref().and_then(|r| r.redirect(url, public_id)))
    })
}

unsafe extern "C" fn catalog_entity_loader(
    url: *const c_char,
    id: *const c_char,
    context: *mut XmlParserCtxt,
) -> *mut XmlParserInput {
    let Some(default_loader) = DEFAULT_LOADER.get().copied().flatten() else {
        return ptr::null_mut();
    };

    let target = c_str(url).and_then(|url| {
        let resolved = redirect(url, c_str(id))?;
        tracing::debug!(url, resolved = %resolved, "Redirecting entity load");
        CString::new(resolved).ok()
    });

    match target {
        Some(target) => unsafe { default_loader(target.as_ptr(), id, context) },
        None => unsafe { default_loader(url, id, context) },
    }
}
