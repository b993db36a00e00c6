//! `argentum` - validate FHIR resources against the packaged schema tables
//! and convert between the JSON and XML wire formats.
//!
//! Validation decodes leniently so every content problem is reported at
//! once; the process exits non-zero when the resource is invalid.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use argentum_codec::Decoder;
use argentum_registry::SchemaRegistry;
use argentum_validator::Validator;

#[derive(Parser)]
#[command(name = "argentum", version, about = "Schema-driven FHIR R4 validation and conversion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a resource and report every validation problem as an OperationOutcome
    Validate {
        /// Input file (.json or .xml)
        file: PathBuf,

        /// Wire format; inferred from the file extension when omitted
        #[arg(long, value_enum)]
        format: Option<WireFormat>,
    },

    /// Convert a resource between the JSON and XML wire formats
    Convert {
        /// Input file (.json or .xml)
        file: PathBuf,

        /// Target format
        #[arg(long, value_enum)]
        to: WireFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WireFormat {
    Json,
    Xml,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let registry = SchemaRegistry::from_embedded().context("loading packaged schema tables")?;

    match cli.command {
        Command::Validate { file, format } => validate(&registry, &file, format),
        Command::Convert { file, to } => convert(&file, to),
    }
}

fn validate(
    registry: &SchemaRegistry,
    file: &Path,
    format: Option<WireFormat>,
) -> anyhow::Result<ExitCode> {
    let node = read_wire_tree(file, format)?;

    let instance = Decoder::lenient(registry)
        .decode_resource(&node)
        .context("resource cannot be decoded")?;
    let outcome = Validator::new(registry).validate(&instance);

    println!(
        "{}",
        serde_json::to_string_pretty(&outcome.to_operation_outcome())?
    );

    if outcome.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn convert(file: &Path, to: WireFormat) -> anyhow::Result<ExitCode> {
    let node = read_wire_tree(file, None)?;

    match to {
        WireFormat::Json => println!("{}", serde_json::to_string_pretty(&node)?),
        WireFormat::Xml => println!("{}", argentum_format::write_xml(&node)?),
    }

    Ok(ExitCode::SUCCESS)
}

fn read_wire_tree(file: &Path, format: Option<WireFormat>) -> anyhow::Result<Value> {
    let text =
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let format = format
        .or_else(|| infer_format(file))
        .context("cannot infer wire format; pass --format")?;

    match format {
        WireFormat::Json => {
            serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))
        }
        WireFormat::Xml => argentum_format::parse_xml(&text)
            .with_context(|| format!("parsing {}", file.display())),
    }
}

fn infer_format(file: &Path) -> Option<WireFormat> {
    match file.extension()?.to_str()? {
        "json" => Some(WireFormat::Json),
        "xml" => Some(WireFormat::Xml),
        _ => None,
    }
}
