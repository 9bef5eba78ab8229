use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::logging::{LogFormat, LogLevel};

/// How violations are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One `location: ... message: ...` line per violation on stderr
    #[default]
    Human,
    /// A JSON array of violations on stdout
    Json,
}

/// Validate XML documents against XML Schema or compiled Schematron rules
#[derive(Parser, Debug, Clone)]
#[command(name = "xml-schemer")]
#[command(about = "Validate XML against XML Schema or compiled Schematron rules, reporting every violation")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long = "config", global = true, value_parser = existing_file)]
    pub config: Option<PathBuf>,

    /// Diagnostic log level
    #[arg(long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Diagnostic log format
    #[arg(long = "log-format", global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Violation report format
    #[arg(long = "format", global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate against an XML Schema
    Schema(SchemaArgs),
    /// Validate with a Schematron rule set compiled to XSLT
    Schematron(SchematronArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SchemaArgs {
    /// XML document to validate
    #[arg(long = "xml", value_parser = existing_file)]
    pub xml: PathBuf,

    /// XML Schema to validate against
    #[arg(long = "xsd", value_parser = existing_file)]
    pub xsd: PathBuf,

    /// OASIS XML catalog for resolving schema includes and imports
    #[arg(long = "catalog", value_parser = existing_file)]
    pub catalog: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SchematronArgs {
    /// XML document to validate
    #[arg(long = "xml", value_parser = existing_file)]
    pub xml: PathBuf,

    /// Schematron rules compiled to an XSLT stylesheet
    #[arg(long = "xslt", value_parser = existing_file)]
    pub xslt: PathBuf,

    /// OASIS XML catalog for resources the stylesheet loads
    #[arg(long = "catalog", value_parser = existing_file)]
    pub catalog: Option<PathBuf>,
}

impl Command {
    pub fn xml(&self) -> &Path {
        match self {
            Command::Schema(args) => &args.xml,
            Command::Schematron(args) => &args.xml,
        }
    }

    pub fn catalog(&self) -> Option<&Path> {
        match self {
            Command::Schema(args) => args.catalog.as_deref(),
            Command::Schematron(args) => args.catalog.as_deref(),
        }
    }
}

/// Accept only paths that exist.
fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("File {} does not exist.", value))
    }
}
