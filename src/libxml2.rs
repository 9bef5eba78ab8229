//! LibXML2 / libxslt FFI Module
//!
//! Safe wrappers around the libxml2 and libxslt calls the validators need:
//! document parsing, XML Schema compilation and validation, XPath queries,
//! OASIS catalog lookups and XSLT execution.
//!
//! ## Why direct FFI
//!
//! No mature pure Rust library validates XML Schema or runs XSLT, and the
//! `libxml` crate covers neither libxslt nor catalogs. Every engine pointer
//! is therefore owned by a small RAII wrapper in this module and freed on
//! every exit path.
//!
//! ## Thread Safety Strategy
//!
//! According to the libxml2 documentation (http://xmlsoft.org/threads.html):
//!
//! - **Initialization** is NOT thread-safe and runs exactly once behind a `Once`.
//! - **Schema parsing** is serialized behind [`SCHEMA_PARSE_LOCK`].
//! - **Validation** is thread-safe for different documents; each call creates
//!   its own validation context against a shared, read-only schema.
//! - **Error handlers** installed with `xmlSetStructuredErrorFunc` are
//!   per-thread, so per-call capture never leaks into another thread.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};

use libc::{c_char, c_int, c_void};

use crate::diagnostics::{DiagnosticCollector, collect_structured_error};
use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2 and libxslt
static LIBXML2_INIT: Once = Once::new();

/// libxml2 schema parsing is not thread-safe; compile one schema at a time.
static SCHEMA_PARSE_LOCK: Mutex<()> = Mutex::new(());

pub type XmlChar = u8;

// Opaque libxml2 / libxslt structures
#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlNode {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlParserInput {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlParserInputBuffer {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSaxHandler {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlXPathContext {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlCatalog {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XsltStylesheet {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlNodeSet {
    pub node_nr: c_int,
    pub node_max: c_int,
    pub node_tab: *mut *mut XmlNode,
}

#[repr(C)]
pub struct XmlXPathObject {
    pub kind: c_int,
    pub nodesetval: *mut XmlNodeSet,
    pub boolval: c_int,
    pub floatval: f64,
    pub stringval: *mut XmlChar,
    pub user: *mut c_void,
    pub index: c_int,
    pub user2: *mut c_void,
    pub index2: c_int,
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

/// `XML_CHAR_ENCODING_NONE`: let the parser detect the encoding
pub const XML_CHAR_ENCODING_NONE: c_int = 0;

/// `xmlErrorLevel` values
pub const XML_ERR_WARNING: c_int = 1;
pub const XML_ERR_ERROR: c_int = 2;
pub const XML_ERR_FATAL: c_int = 3;

pub type XmlStructuredErrorFunc = Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

pub type XmlExternalEntityLoader = Option<
    unsafe extern "C" fn(
        url: *const c_char,
        id: *const c_char,
        context: *mut XmlParserCtxt,
    ) -> *mut XmlParserInput,
>;

pub type XmlFreeFunc = Option<unsafe extern "C" fn(mem: *mut c_void)>;

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub static xmlFree: XmlFreeFunc;

    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    // Document parsing
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlReadFile(filename: *const c_char, encoding: *const c_char, options: c_int) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlBuildURI(uri: *const XmlChar, base: *const XmlChar) -> *mut XmlChar;
    pub fn xmlParserInputBufferCreateMem(
        mem: *const c_char,
        size: c_int,
        enc: c_int,
    ) -> *mut XmlParserInputBuffer;

    // Error and resource hooks
    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);
    pub fn xmlGetExternalEntityLoader() -> XmlExternalEntityLoader;
    pub fn xmlSetExternalEntityLoader(loader: XmlExternalEntityLoader);

    // Schema parsing functions
    pub fn xmlSchemaNewDocParserCtxt(doc: *mut XmlDoc) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *mut XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateSetFilename(ctxt: *mut XmlSchemaValidCtxt, filename: *const c_char);
    /// Consumes `input`.
    pub fn xmlSchemaValidateStream(
        ctxt: *mut XmlSchemaValidCtxt,
        input: *mut XmlParserInputBuffer,
        enc: c_int,
        sax: *mut XmlSaxHandler,
        user_data: *mut c_void,
    ) -> c_int;

    // XPath
    pub fn xmlXPathNewContext(doc: *mut XmlDoc) -> *mut XmlXPathContext;
    pub fn xmlXPathFreeContext(ctxt: *mut XmlXPathContext);
    pub fn xmlXPathRegisterNs(
        ctxt: *mut XmlXPathContext,
        prefix: *const XmlChar,
        ns_uri: *const XmlChar,
    ) -> c_int;
    pub fn xmlXPathEvalExpression(expr: *const XmlChar, ctxt: *mut XmlXPathContext) -> *mut XmlXPathObject;
    pub fn xmlXPathNodeEval(
        node: *mut XmlNode,
        expr: *const XmlChar,
        ctxt: *mut XmlXPathContext,
    ) -> *mut XmlXPathObject;
    pub fn xmlXPathFreeObject(obj: *mut XmlXPathObject);

    // OASIS catalogs
    pub fn xmlLoadACatalog(filename: *const c_char) -> *mut XmlCatalog;
    pub fn xmlACatalogResolvePublic(catal: *mut XmlCatalog, pub_id: *const XmlChar) -> *mut XmlChar;
    pub fn xmlACatalogResolveSystem(catal: *mut XmlCatalog, sys_id: *const XmlChar) -> *mut XmlChar;
    pub fn xmlACatalogResolveURI(catal: *mut XmlCatalog, uri: *const XmlChar) -> *mut XmlChar;
    pub fn xmlFreeCatalog(catal: *mut XmlCatalog);
}

// External libxslt FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxslt"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xslt"))]
unsafe extern "C" {
    pub fn xsltInit();
    pub fn xsltParseStylesheetDoc(doc: *mut XmlDoc) -> *mut XsltStylesheet;
    pub fn xsltApplyStylesheet(
        style: *mut XsltStylesheet,
        doc: *mut XmlDoc,
        params: *mut *const c_char,
    ) -> *mut XmlDoc;
    pub fn xsltFreeStylesheet(style: *mut XsltStylesheet);
}

/// Convert a Rust string for an FFI call.
pub(crate) fn c_string(value: &str) -> LibXml2Result<CString> {
    CString::new(value).map_err(|_| LibXml2Error::InteriorNul {
        value: value.to_string(),
    })
}

/// Copy a libxml2-owned string and release it with `xmlFree`.
///
/// # Safety
///
/// `value` must be null or a string allocated by libxml2 that the caller owns.
pub(crate) unsafe fn take_xml_string(value: *mut XmlChar) -> Option<String> {
    if value.is_null() {
        return None;
    }
    let copied = unsafe { CStr::from_ptr(value as *const c_char) }
        .to_string_lossy()
        .into_owned();
    unsafe {
        if let Some(free) = xmlFree {
            free(value as *mut c_void);
        }
    }
    Some(copied)
}

/// Resolve `reference` against `base` the way libxml2 does for schema locations.
pub(crate) fn build_uri(reference: &str, base: &str) -> LibXml2Result<Option<String>> {
    let c_reference = c_string(reference)?;
    let c_base = c_string(base)?;
    unsafe {
        Ok(take_xml_string(xmlBuildURI(
            c_reference.as_ptr() as *const XmlChar,
            c_base.as_ptr() as *const XmlChar,
        )))
    }
}

/// Routes libxml2's per-thread structured errors into a collector.
///
/// The handler is removed when the guard drops, on every exit path. The
/// collector stays mutably borrowed for the guard's lifetime so nothing else
/// can touch it while libxml2 holds the pointer.
pub struct ErrorCapture<'a> {
    user_data: *mut c_void,
    _collector: PhantomData<&'a mut DiagnosticCollector>,
}

impl<'a> ErrorCapture<'a> {
    pub fn install(collector: &'a mut DiagnosticCollector) -> Self {
        let user_data = collector as *mut DiagnosticCollector as *mut c_void;
        unsafe {
            xmlSetStructuredErrorFunc(user_data, Some(collect_structured_error));
        }
        ErrorCapture {
            user_data,
            _collector: PhantomData,
        }
    }

    pub(crate) fn user_data(&self) -> *mut c_void {
        self.user_data
    }
}

impl Drop for ErrorCapture<'_> {
    fn drop(&mut self) {
        unsafe {
            xmlSetStructuredErrorFunc(ptr::null_mut(), None);
        }
    }
}

/// An owned, parsed libxml2 document.
#[derive(Debug)]
pub struct XmlDocument {
    ptr: *mut XmlDoc,
}

impl XmlDocument {
    /// Parse an in-memory buffer, using `system_id` as the document URL.
    ///
    /// Returns `Ok(None)` when the parser gave up; the reasons were reported
    /// through whatever error handler is active on this thread.
    pub fn parse(bytes: &[u8], system_id: &str) -> LibXml2Result<Option<Self>> {
        let size = c_int::try_from(bytes.len())
            .map_err(|_| LibXml2Error::InputTooLarge { size: bytes.len() })?;
        let c_url = c_string(system_id)?;
        let doc = unsafe {
            xmlReadMemory(
                bytes.as_ptr() as *const c_char,
                size,
                c_url.as_ptr(),
                ptr::null(),
                0,
            )
        };
        Ok(Self::from_raw(doc))
    }

    /// Parse a document by URL or path through libxml2's own loader.
    pub fn read(url: &str) -> LibXml2Result<Option<Self>> {
        let c_url = c_string(url)?;
        let doc = unsafe { xmlReadFile(c_url.as_ptr(), ptr::null(), 0) };
        Ok(Self::from_raw(doc))
    }

    fn from_raw(ptr: *mut XmlDoc) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(XmlDocument { ptr })
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut XmlDoc {
        self.ptr
    }

    /// Give up ownership, e.g. to a stylesheet that now frees the document.
    fn into_raw(self) -> *mut XmlDoc {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }

    pub fn xpath(&self) -> LibXml2Result<XPathContext<'_>> {
        let ctxt = unsafe { xmlXPathNewContext(self.ptr) };
        if ctxt.is_null() {
            return Err(LibXml2Error::MemoryAllocation);
        }
        Ok(XPathContext {
            ptr: ctxt,
            _doc: PhantomData,
        })
    }
}

impl Drop for XmlDocument {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// A node borrowed from a live [`XmlDocument`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'d> {
    ptr: *mut XmlNode,
    _doc: PhantomData<&'d XmlDocument>,
}

/// XPath evaluation context over one document.
pub struct XPathContext<'d> {
    ptr: *mut XmlXPathContext,
    _doc: PhantomData<&'d XmlDocument>,
}

/// Frees an XPath result object when dropped.
struct XPathObjectGuard(*mut XmlXPathObject);

impl Drop for XPathObjectGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { xmlXPathFreeObject(self.0) };
        }
    }
}

impl<'d> XPathContext<'d> {
    pub fn register_namespace(&self, prefix: &str, uri: &str) -> LibXml2Result<()> {
        let c_prefix = c_string(prefix)?;
        let c_uri = c_string(uri)?;
        let rc = unsafe {
            xmlXPathRegisterNs(
                self.ptr,
                c_prefix.as_ptr() as *const XmlChar,
                c_uri.as_ptr() as *const XmlChar,
            )
        };
        if rc != 0 {
            return Err(LibXml2Error::XPathFailed {
                expression: format!("xmlns:{}={}", prefix, uri),
            });
        }
        Ok(())
    }

    /// Select nodes with a document-level expression, in document order.
    pub fn select_nodes(&self, expression: &str) -> LibXml2Result<Vec<NodeRef<'d>>> {
        let c_expr = c_string(expression)?;
        let object = unsafe { xmlXPathEvalExpression(c_expr.as_ptr() as *const XmlChar, self.ptr) };
        if object.is_null() {
            return Err(LibXml2Error::XPathFailed {
                expression: expression.to_string(),
            });
        }
        let guard = XPathObjectGuard(object);

        let mut nodes = Vec::new();
        unsafe {
            let set = (*guard.0).nodesetval;
            if !set.is_null() && !(*set).node_tab.is_null() {
                let count = usize::try_from((*set).node_nr).unwrap_or(0);
                for i in 0..count {
                    nodes.push(NodeRef {
                        ptr: *(*set).node_tab.add(i),
                        _doc: PhantomData,
                    });
                }
            }
        }
        Ok(nodes)
    }

    /// Evaluate a string-valued expression, relative to `node` when given.
    pub fn eval_string(&self, node: Option<NodeRef<'d>>, expression: &str) -> LibXml2Result<String> {
        let c_expr = c_string(expression)?;
        let object = unsafe {
            match node {
                Some(node) => xmlXPathNodeEval(node.ptr, c_expr.as_ptr() as *const XmlChar, self.ptr),
                None => xmlXPathEvalExpression(c_expr.as_ptr() as *const XmlChar, self.ptr),
            }
        };
        if object.is_null() {
            return Err(LibXml2Error::XPathFailed {
                expression: expression.to_string(),
            });
        }
        let guard = XPathObjectGuard(object);

        let value = unsafe { (*guard.0).stringval };
        if value.is_null() {
            return Ok(String::new());
        }
        Ok(unsafe { CStr::from_ptr(value as *const c_char) }
            .to_string_lossy()
            .into_owned())
    }
}

impl Drop for XPathContext<'_> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xmlXPathFreeContext(self.ptr) };
        }
    }
}

/// Thread-safe wrapper for a compiled libxml2 schema.
///
/// The schema keeps its source document alive: libxml2 does not take
/// ownership of documents handed to `xmlSchemaNewDocParserCtxt`. Clones
/// share the compiled schema.
#[derive(Debug, Clone)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    doc: XmlDocument,
}

// Safety: libxml2 documentation states that xmlSchema structures are thread-safe for reading
// See: http://xmlsoft.org/threads.html
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must be null or a schema returned by `xmlSchemaParse` for `doc`
    /// that nothing else frees.
    unsafe fn from_raw(ptr: *mut XmlSchema, doc: XmlDocument) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed);
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner { ptr, doc }),
        })
    }

    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        // The source document is freed afterwards by its own Drop.
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// A compiled XSLT stylesheet; owns the document it was compiled from.
pub struct Stylesheet {
    ptr: *mut XsltStylesheet,
}

impl Stylesheet {
    /// Compile `doc`. On failure the document is freed and `None` returned.
    pub fn compile(doc: XmlDocument) -> Option<Self> {
        let style = unsafe { xsltParseStylesheetDoc(doc.as_ptr()) };
        if style.is_null() {
            return None;
        }
        let _owned_by_stylesheet = doc.into_raw();
        Some(Stylesheet { ptr: style })
    }

    /// Run the stylesheet, producing an in-memory result tree.
    pub fn apply(&self, input: &XmlDocument) -> Option<XmlDocument> {
        let result = unsafe { xsltApplyStylesheet(self.ptr, input.as_ptr(), ptr::null_mut()) };
        XmlDocument::from_raw(result)
    }
}

impl Drop for Stylesheet {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { xsltFreeStylesheet(self.ptr) };
            self.ptr = ptr::null_mut();
        }
    }
}

/// Outcome of one libxml2 schema validation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with errors (return code > 0)
    Invalid { error_count: i32 },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32 },
}

impl ValidationResult {
    pub fn from_code(code: c_int) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid { error_count: n },
            n => ValidationResult::InternalError { code: n },
        }
    }
}

/// Entry point to the engine.
///
/// Creating a wrapper initializes libxml2 and libxslt exactly once per
/// process and installs the catalog-aware entity loader.
#[derive(Clone)]
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
            xsltInit();
            crate::loader::install();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Compile a schema from its parsed document.
    ///
    /// Parser diagnostics go to the collector behind `capture`. Serialized
    /// process-wide, since libxml2 schema parsing is not thread-safe.
    pub fn parse_schema(&self, doc: XmlDocument, capture: &ErrorCapture<'_>) -> LibXml2Result<XmlSchemaPtr> {
        let _serialized = schema_parse_lock();
        unsafe {
            let parser_ctxt = xmlSchemaNewDocParserCtxt(doc.as_ptr());
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(collect_structured_error),
                capture.user_data(),
            );

            let schema_ptr = xmlSchemaParse(parser_ctxt);

            // Always free the parser context
            xmlSchemaFreeParserCtxt(parser_ctxt);

            XmlSchemaPtr::from_raw(schema_ptr, doc)
        }
    }

    /// Stream `bytes` through the parser into a schema validator.
    ///
    /// Parser and validity diagnostics reach the collector behind `capture`
    /// interleaved, in document order. A document that stops being
    /// well-formed ends the pass early with a negative code; everything
    /// reported up to that point has already been collected.
    ///
    /// Safe to call concurrently: each call creates its own validation
    /// context and the schema is only read.
    pub fn validate_stream(
        &self,
        schema: &XmlSchemaPtr,
        bytes: &[u8],
        system_id: &str,
        capture: &ErrorCapture<'_>,
    ) -> LibXml2Result<ValidationResult> {
        let size = c_int::try_from(bytes.len())
            .map_err(|_| LibXml2Error::InputTooLarge { size: bytes.len() })?;
        let c_system_id = c_string(system_id)?;

        unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(collect_structured_error),
                capture.user_data(),
            );
            xmlSchemaValidateSetFilename(valid_ctxt, c_system_id.as_ptr());

            let input = xmlParserInputBufferCreateMem(
                bytes.as_ptr() as *const c_char,
                size,
                XML_CHAR_ENCODING_NONE,
            );
            if input.is_null() {
                xmlSchemaFreeValidCtxt(valid_ctxt);
                return Err(LibXml2Error::MemoryAllocation);
            }

            let result_code = xmlSchemaValidateStream(
                valid_ctxt,
                input,
                XML_CHAR_ENCODING_NONE,
                ptr::null_mut(),
                ptr::null_mut(),
            );

            // Always free the validation context
            xmlSchemaFreeValidCtxt(valid_ctxt);

            Ok(ValidationResult::from_code(result_code))
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}

fn schema_parse_lock() -> MutexGuard<'static, ()> {
    SCHEMA_PARSE_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
