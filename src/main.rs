use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use xml_schemer::cli::{Cli, Command};
use xml_schemer::config::{Config, ConfigManager};
use xml_schemer::logging::init_logging;
use xml_schemer::output::Output;
use xml_schemer::{SchemaValidator, SchematronValidator, Validator, Violation, XmlSource};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // Help and version are not failures
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match ConfigManager::load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.logging.format, config.logging.level);

    match run(&cli.command, &config) {
        Ok(violations) => {
            let output = Output::new(config.output.format.into());
            if let Err(err) = output.write_report(&violations, &mut io::stdout(), &mut io::stderr()) {
                tracing::error!("Failed to write report: {}", err);
                return ExitCode::FAILURE;
            }
            if violations.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: &Command, config: &Config) -> Result<Vec<Violation>> {
    let catalog = config.catalog.as_deref();

    let validator: Box<dyn Validator> = match command {
        Command::Schema(args) => Box::new(
            SchemaValidator::new(&XmlSource::file(&args.xsd), catalog)
                .with_context(|| format!("Failed to load schema {}", args.xsd.display()))?,
        ),
        Command::Schematron(args) => Box::new(SchematronValidator::new(
            XmlSource::file(&args.xslt),
            catalog,
        )),
    };

    validate(validator.as_ref(), command.xml())
}

fn validate(validator: &dyn Validator, xml: &Path) -> Result<Vec<Violation>> {
    let violations = validator
        .validate(&XmlSource::file(xml))
        .with_context(|| format!("Failed to validate {}", xml.display()))?;
    tracing::info!(
        document = %xml.display(),
        violations = violations.len(),
        "Validation finished"
    );
    Ok(violations)
}
