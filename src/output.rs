//! Violation reporting
//!
//! Human output is the literal `location: ... message: ...` rendering, one
//! violation per line on stderr, so it stays machine-diffable. JSON output
//! goes to stdout.

use std::io::{self, Write};

use crate::cli::OutputFormat;
use crate::violation::Violation;

pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn format_violations(&self, violations: &[Violation]) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Human => Ok(violations
                .iter()
                .map(|violation| format!("{}\n", violation))
                .collect()),
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(violations)?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    /// Write the report to whichever stream the format belongs on.
    pub fn write_report<O: Write, E: Write>(
        &self,
        violations: &[Violation],
        stdout: &mut O,
        stderr: &mut E,
    ) -> io::Result<()> {
        let report = self.format_violations(violations).map_err(io::Error::other)?;
        match self.format {
            OutputFormat::Human => {
                stderr.write_all(report.as_bytes())?;
                stderr.flush()
            }
            OutputFormat::Json => {
                stdout.write_all(report.as_bytes())?;
                stdout.flush()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violations() -> Vec<Violation> {
        vec![
            Violation::new("doc.xml:3:0", "Element 'a': This element is not expected."),
            Violation::new("/root/b", "b must not be empty"),
        ]
    }

    #[test]
    fn test_human_report_goes_to_stderr() {
        let output = Output::new(OutputFormat::Human);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        output
            .write_report(&violations(), &mut stdout, &mut stderr)
            .unwrap();

        assert!(stdout.is_empty());
        assert_eq!(
            String::from_utf8(stderr).unwrap(),
            "location: doc.xml:3:0 message: Element 'a': This element is not expected.\n\
             location: /root/b message: b must not be empty\n"
        );
    }

    #[test]
    fn test_json_report_goes_to_stdout() {
        let output = Output::new(OutputFormat::Json);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        output
            .write_report(&violations(), &mut stdout, &mut stderr)
            .unwrap();

        assert!(stderr.is_empty());
        let parsed: Vec<Violation> = serde_json::from_slice(&stdout).unwrap();
        assert_eq!(parsed, violations());
    }

    #[test]
    fn test_empty_reports() {
        assert_eq!(
            Output::new(OutputFormat::Human)
                .format_violations(&[])
                .unwrap(),
            ""
        );
        assert_eq!(
            Output::new(OutputFormat::Json)
                .format_violations(&[])
                .unwrap()
                .trim(),
            "[]"
        );
    }
}
