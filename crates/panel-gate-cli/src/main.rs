// crates/panel-gate-cli/src/main.rs
// ============================================================================
// Module: Panel Gate CLI Entry Point
// Description: Command dispatcher for offline inference and catalog tooling.
// Purpose: Run the eligibility gate and report assembler over JSON inputs.
// Dependencies: clap, panel-gate-config, panel-gate-core, serde, thiserror, time.
// ============================================================================

//! ## Overview
//! `panel-gate` reads a run and a feature pack from JSON files, evaluates
//! them against the configured output catalog, and prints canonical JSON.
//! Inputs are untrusted: every file read is size-bounded and every document
//! is validated before gating.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use panel_gate_config::PanelGateConfig;
use panel_gate_config::load_catalog;
use panel_gate_core::Domain;
use panel_gate_core::FeaturePack;
use panel_gate_core::InferenceEngine;
use panel_gate_core::OutputKey;
use panel_gate_core::PrecomputedEstimates;
use panel_gate_core::Run;
use panel_gate_core::SupportType;
use panel_gate_core::digest::canonical_json_bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a run JSON input.
const MAX_RUN_BYTES: usize = 8 * 1024 * 1024;
/// Maximum size of a feature pack JSON input.
const MAX_FEATURE_PACK_BYTES: usize = 1024 * 1024;
/// Maximum size of a precomputed estimates JSON input.
const MAX_ESTIMATES_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "panel-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate every catalog output and print the inference pack.
    Infer(InferCommand),
    /// Evaluate the eligibility gate for a single output.
    Gate(GateCommand),
    /// Output catalog utilities.
    Catalog {
        /// Selected catalog subcommand.
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

/// Arguments for `infer`.
#[derive(Args, Debug)]
struct InferCommand {
    /// Path to the run JSON.
    #[arg(long, value_name = "PATH")]
    run: PathBuf,
    /// Path to the feature pack JSON.
    #[arg(long, value_name = "PATH")]
    features: PathBuf,
    /// Path to precomputed engine estimates (`output_key -> [estimate]`).
    #[arg(long, value_name = "PATH")]
    estimates: Option<PathBuf>,
    /// Path to `panel-gate.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Evaluation time (RFC 3339); defaults to now.
    #[arg(long, value_name = "RFC3339")]
    as_of: Option<String>,
}

/// Arguments for `gate`.
#[derive(Args, Debug)]
struct GateCommand {
    /// Output key to evaluate.
    #[arg(long, value_name = "KEY")]
    output: String,
    /// Path to the run JSON.
    #[arg(long, value_name = "PATH")]
    run: PathBuf,
    /// Path to the feature pack JSON.
    #[arg(long, value_name = "PATH")]
    features: PathBuf,
    /// Path to `panel-gate.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Evaluation time (RFC 3339); defaults to now.
    #[arg(long, value_name = "RFC3339")]
    as_of: Option<String>,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// List the configured catalog.
    List {
        /// Path to `panel-gate.toml`.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Validate a TOML catalog file.
    Validate {
        /// Path to the catalog file.
        #[arg(long, value_name = "PATH")]
        path: PathBuf,
    },
}

/// One row of `catalog list` output.
#[derive(Debug, Serialize)]
struct CatalogRow<'a> {
    /// Output key.
    key: &'a OutputKey,
    /// Output domain.
    domain: Domain,
    /// Support type.
    support_type: SupportType,
    /// Reporting unit.
    unit: &'a str,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Infer(command) => command_infer(command),
        Commands::Gate(command) => command_gate(command),
        Commands::Catalog {
            command,
        } => command_catalog(command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs full inference and prints the pack.
fn command_infer(command: InferCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let mut engine = build_engine(&config)?;
    if let Some(path) = &command.estimates {
        let bytes = read_input(path, MAX_ESTIMATES_BYTES, "estimates")?;
        let estimates = PrecomputedEstimates::from_json_slice(&bytes)
            .map_err(|err| CliError::new(format!("invalid estimates: {err}")))?;
        engine = engine.with_estimators(estimates.into_estimators());
    }
    let run: Run = read_json(&command.run, MAX_RUN_BYTES, "run")?;
    let features: FeaturePack = read_json(&command.features, MAX_FEATURE_PACK_BYTES, "features")?;
    let evaluated_at = resolve_as_of(command.as_of.as_deref())?;
    let pack = engine
        .infer(&run, &features, evaluated_at)
        .map_err(|err| CliError::new(format!("inference failed: {err}")))?;
    write_canonical_json(&pack)?;
    Ok(ExitCode::SUCCESS)
}

/// Evaluates the gate for one output and prints the evaluation.
fn command_gate(command: GateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let engine = build_engine(&config)?;
    let run: Run = read_json(&command.run, MAX_RUN_BYTES, "run")?;
    let features: FeaturePack = read_json(&command.features, MAX_FEATURE_PACK_BYTES, "features")?;
    let evaluated_at = resolve_as_of(command.as_of.as_deref())?;
    let evaluation = engine
        .gate_output(&OutputKey::new(command.output), &run, &features, evaluated_at)
        .map_err(|err| CliError::new(format!("gate evaluation failed: {err}")))?;
    write_canonical_json(&evaluation)?;
    Ok(ExitCode::SUCCESS)
}

/// Dispatches catalog subcommands.
fn command_catalog(command: CatalogCommand) -> CliResult<ExitCode> {
    match command {
        CatalogCommand::List {
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let catalog = config
                .build_catalog()
                .map_err(|err| CliError::new(format!("failed to load catalog: {err}")))?;
            let rows: Vec<CatalogRow<'_>> = catalog
                .iter()
                .map(|definition| CatalogRow {
                    key: &definition.key,
                    domain: definition.domain,
                    support_type: definition.support_type,
                    unit: &definition.unit,
                })
                .collect();
            write_canonical_json(&rows)?;
        }
        CatalogCommand::Validate {
            path,
        } => {
            let catalog = load_catalog(&path)
                .map_err(|err| CliError::new(format!("catalog invalid: {err}")))?;
            write_stdout_line(&format!("catalog valid: {} outputs", catalog.len()))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration from an explicit path or the default locations.
fn load_config(path: Option<&Path>) -> CliResult<PanelGateConfig> {
    PanelGateConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Builds the inference engine from configuration.
fn build_engine(config: &PanelGateConfig) -> CliResult<InferenceEngine> {
    config.build_engine().map_err(|err| CliError::new(format!("failed to build engine: {err}")))
}

/// Parses `--as-of`, defaulting to the current UTC time.
fn resolve_as_of(value: Option<&str>) -> CliResult<OffsetDateTime> {
    value.map_or_else(
        || Ok(OffsetDateTime::now_utc()),
        |raw| {
            OffsetDateTime::parse(raw, &Rfc3339)
                .map_err(|err| CliError::new(format!("invalid --as-of {raw}: {err}")))
        },
    )
}

/// Reads and deserializes a JSON input file.
fn read_json<T: DeserializeOwned>(path: &Path, max_bytes: usize, label: &str) -> CliResult<T> {
    let bytes = read_input(path, max_bytes, label)?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid {label} json {}: {err}", path.display())))
}

/// Reads an input file, mapping limit errors to CLI errors.
fn read_input(path: &Path, max_bytes: usize, label: &str) -> CliResult<Vec<u8>> {
    read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read {label} {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "{label} file {} exceeds size limit ({size} > {limit} bytes)",
            path.display()
        )),
    })
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Writes canonical JSON to stdout with a trailing newline.
fn write_canonical_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let mut bytes = canonical_json_bytes(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, err: &std::io::Error) -> String {
    format!("failed to write to {stream}: {err}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
