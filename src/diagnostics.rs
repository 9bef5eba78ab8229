//! Diagnostic collection
//!
//! The engines report problems as a stream of severity-tagged events.
//! A [`DiagnosticCollector`] turns one validation pass worth of those events
//! into an ordered violation list. It is created per call and never shared.

use std::ffi::CStr;

use libc::{c_char, c_void};

use crate::libxml2::{XML_ERR_ERROR, XML_ERR_FATAL, XML_ERR_WARNING, xmlError};
use crate::violation::Violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// One located diagnostic reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub severity: Severity,
    pub location: String,
    pub message: String,
}

impl DiagnosticEvent {
    pub fn new(severity: Severity, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Accumulates errors and fatal errors as violations, in arrival order.
///
/// Warnings are logged and dropped.
#[derive(Debug)]
pub struct DiagnosticCollector {
    system_id: String,
    violations: Vec<Violation>,
    fatal_seen: bool,
}

impl DiagnosticCollector {
    /// `system_id` stands in for the file part of locations the engine
    /// reports without one.
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            violations: Vec::new(),
            fatal_seen: false,
        }
    }

    pub fn record(&mut self, event: DiagnosticEvent) {
        match event.severity {
            Severity::Warning => {
                tracing::warn!(location = %event.location, "{}", event.message);
            }
            Severity::Error | Severity::Fatal => {
                if event.severity == Severity::Fatal {
                    self.fatal_seen = true;
                }
                self.violations
                    .push(Violation::new(event.location, event.message));
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.violations.is_empty()
    }

    pub(crate) fn has_fatal(&self) -> bool {
        self.fatal_seen
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// All recorded messages joined, for error details.
    pub(crate) fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{}: {}", v.location(), v.message()))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn location(&self, file: Option<&str>, line: i32, column: i32) -> String {
        format!("{}:{}:{}", file.unwrap_or(&self.system_id), line, column)
    }
}

fn c_str<'a>(value: *const c_char) -> Option<&'a str> {
    if value.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(value) }.to_str().ok()
}

/// Callback for libxml2 to report structured errors into a collector.
///
/// # Safety
///
/// `user_data` must point to a live `DiagnosticCollector` that nothing else
/// is accessing for the duration of the call.
pub(crate) unsafe extern "C" fn collect_structured_error(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let collector = unsafe { &mut *(user_data as *mut DiagnosticCollector) };
    let error = unsafe { &*error };

    let severity = match error.level {
        XML_ERR_WARNING => Severity::Warning,
        XML_ERR_ERROR => Severity::Error,
        XML_ERR_FATAL => Severity::Fatal,
        _ => return,
    };

    // Column travels in int2
    let location = collector.location(c_str(error.file), error.line, error.int2);
    let message = c_str(error.message).unwrap_or("").trim().to_string();

    collector.record(DiagnosticEvent::new(severity, location, message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    fn raw_error(level: i32, file: Option<&CString>, message: &CString, line: i32, column: i32) -> xmlError {
        xmlError {
            domain: 17,
            code: 1871,
            message: message.as_ptr(),
            level,
            file: file.map_or(ptr::null(), |f| f.as_ptr()),
            line,
            str1: ptr::null(),
            str2: ptr::null(),
            str3: ptr::null(),
            int1: 0,
            int2: column,
            ctxt: ptr::null_mut(),
            node: ptr::null_mut(),
        }
    }

    #[test]
    fn test_errors_and_fatals_recorded_in_order() {
        let mut collector = DiagnosticCollector::new("doc.xml");
        collector.record(DiagnosticEvent::new(Severity::Error, "doc.xml:3:0", "first"));
        collector.record(DiagnosticEvent::new(Severity::Fatal, "doc.xml:9:4", "second"));
        collector.record(DiagnosticEvent::new(Severity::Error, "doc.xml:2:0", "third"));

        let messages: Vec<&str> = collector.violations().iter().map(|v| v.message()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert!(collector.has_errors());
        assert!(collector.has_fatal());
    }

    #[test]
    fn test_warnings_never_become_violations() {
        let mut collector = DiagnosticCollector::new("doc.xml");
        collector.record(DiagnosticEvent::new(Severity::Warning, "doc.xml:1:1", "just a warning"));
        collector.record(DiagnosticEvent::new(Severity::Warning, "doc.xml:2:1", "another"));

        assert!(!collector.has_errors());
        assert!(!collector.has_fatal());
        assert!(collector.into_violations().is_empty());
    }

    #[test]
    fn test_fatal_and_error_render_identically() {
        let mut collector = DiagnosticCollector::new("doc.xml");
        collector.record(DiagnosticEvent::new(Severity::Error, "doc.xml:1:1", "m"));
        collector.record(DiagnosticEvent::new(Severity::Fatal, "doc.xml:1:1", "m"));
        let violations = collector.into_violations();
        assert_eq!(violations[0], violations[1]);
    }

    #[test]
    fn test_callback_builds_location_from_error() {
        let mut collector = DiagnosticCollector::new("fallback.xml");
        let file = CString::new("party.xml").unwrap();
        let message = CString::new("Element 'x': This element is not expected.\n").unwrap();
        let mut error = raw_error(XML_ERR_ERROR, Some(&file), &message, 12, 7);

        unsafe {
            collect_structured_error(&mut collector as *mut DiagnosticCollector as *mut c_void, &mut error);
        }

        let violations = collector.into_violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location(), "party.xml:12:7");
        assert_eq!(violations[0].message(), "Element 'x': This element is not expected.");
    }

    #[test]
    fn test_callback_falls_back_to_system_id() {
        let mut collector = DiagnosticCollector::new("inline.xml");
        let message = CString::new("Premature end of data").unwrap();
        let mut error = raw_error(XML_ERR_FATAL, None, &message, 1, 14);

        unsafe {
            collect_structured_error(&mut collector as *mut DiagnosticCollector as *mut c_void, &mut error);
        }

        assert!(collector.has_fatal());
        assert_eq!(collector.violations()[0].location(), "inline.xml:1:14");
    }

    #[test]
    fn test_callback_drops_warnings_and_unknown_levels() {
        let mut collector = DiagnosticCollector::new("doc.xml");
        let message = CString::new("xmlns:x: URI relative is not absolute").unwrap();
        let mut warning = raw_error(XML_ERR_WARNING, None, &message, 1, 1);
        let mut none = raw_error(0, None, &message, 1, 1);

        unsafe {
            let user_data = &mut collector as *mut DiagnosticCollector as *mut c_void;
            collect_structured_error(user_data, &mut warning);
            collect_structured_error(user_data, &mut none);
            collect_structured_error(user_data, ptr::null_mut());
        }

        assert!(!collector.has_errors());
    }

    #[test]
    fn test_summary_joins_violations() {
        let mut collector = DiagnosticCollector::new("doc.xml");
        collector.record(DiagnosticEvent::new(Severity::Fatal, "doc.xml:1:5", "bad"));
        collector.record(DiagnosticEvent::new(Severity::Fatal, "doc.xml:2:1", "worse"));
        assert_eq!(collector.summary(), "doc.xml:1:5: bad; doc.xml:2:1: worse");
    }
}
