//! Focus CLI - Command-line interface for focus-signal
//!
//! Commands:
//! - analyze: Enrich a window-focus log and compute scores
//! - validate: Check a log for malformed rows and data quality issues
//! - doctor: Diagnose configuration and label files
//! - schema: Print the input and output column contracts

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use focus_signal::adapter::{parse_event_bytes, TIMESTAMP_COLUMN, TITLE_COLUMN};
use focus_signal::analytics::quality_flags;
use focus_signal::encoder::{encode_table, write_atomic, REPORT_VERSION};
use focus_signal::types::QualityFlag;
use focus_signal::{
    CategoryOracle, Classification, EnrichedRow, FocusPipeline, OracleError,
    PipelineConfig, PipelineError, ReportEncoder, StaticLabelOracle, PRODUCER_NAME, VERSION,
};

/// Focus - Behavioral focus signals from window-focus logs
#[derive(Parser)]
#[command(name = "focus")]
#[command(version = VERSION)]
#[command(about = "Derive focus quality and context switch cost from window logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a window log and compute FQS, CSC and risk
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Enriched table output path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Write the JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Title-to-category label file (JSON)
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Save resolved labels after the run
        #[arg(long)]
        save_labels: Option<PathBuf>,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Sampling interval in seconds (overrides the config file)
        #[arg(long)]
        interval: Option<u32>,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "csv")]
        output_format: OutputFormat,
    },

    /// Check a window log for dropped rows and quality issues
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Sampling interval in seconds (overrides the config file)
        #[arg(long)]
        interval: Option<u32>,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and label files
    Doctor {
        /// Check a pipeline configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check a label file
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
}

impl From<InputFormat> for focus_signal::InputFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Csv => focus_signal::InputFormat::Csv,
            InputFormat::Ndjson => focus_signal::InputFormat::Ndjson,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of rows
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl From<OutputFormat> for focus_signal::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => focus_signal::OutputFormat::Csv,
            OutputFormat::Json => focus_signal::OutputFormat::Json,
            OutputFormat::JsonPretty => focus_signal::OutputFormat::JsonPretty,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Window log columns
    Input,
    /// Enriched table columns
    Output,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FocusCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            report,
            labels,
            save_labels,
            config,
            interval,
            input_format,
            output_format,
        } => cmd_analyze(AnalyzeArgs {
            input,
            output,
            report,
            labels,
            save_labels,
            config,
            interval,
            input_format,
            output_format,
        }),

        Commands::Validate {
            input,
            config,
            interval,
            input_format,
            json,
        } => {
            let config = load_config(config.as_deref(), interval)?;
            cmd_validate(&input, &config, input_format, json)
        }

        Commands::Doctor {
            config,
            labels,
            json,
        } => cmd_doctor(config.as_deref(), labels.as_deref(), json),

        Commands::Schema { schema_type, json } => cmd_schema(schema_type, json),
    }
}

struct AnalyzeArgs {
    input: PathBuf,
    output: PathBuf,
    report: Option<PathBuf>,
    labels: Option<PathBuf>,
    save_labels: Option<PathBuf>,
    config: Option<PathBuf>,
    interval: Option<u32>,
    input_format: InputFormat,
    output_format: OutputFormat,
}

fn cmd_analyze(args: AnalyzeArgs) -> Result<(), FocusCliError> {
    let config = load_config(args.config.as_deref(), args.interval)?;
    let mut pipeline = FocusPipeline::new(config)?;

    // Build the label oracle
    let oracle: Box<dyn CategoryOracle> = match &args.labels {
        Some(path) => {
            let oracle = StaticLabelOracle::from_json(&fs::read_to_string(path)?)?;
            log::info!("loaded {} labels from {}", oracle.len(), path.display());
            Box::new(oracle)
        }
        None => {
            log::warn!("no label file given; every title will be Unclassified");
            Box::new(|_: &str| -> Result<Classification, OracleError> {
                Err(OracleError::Rejected("no label source configured".to_string()))
            })
        }
    };

    // Read and parse input
    let input_data = read_input(&args.input)?;
    let (log, adapter_stats) = parse_event_bytes(&input_data, args.input_format.into())?;

    let output = pipeline.run_with_stats(&log, oracle.as_ref(), adapter_stats);

    // Write enriched table
    let table = encode_table(&output.rows, args.output_format.into())?;
    write_output(&args.output, &table)?;

    // Write run report
    if let Some(report_path) = &args.report {
        let report_json = ReportEncoder::new().encode_to_json(&output)?;
        write_output(report_path, report_json.as_bytes())?;
    }

    // Save labels if requested
    if let Some(labels_path) = &args.save_labels {
        let labels_json = pipeline.save_labels()?;
        write_atomic(labels_path, labels_json.as_bytes())?;
        log::info!("saved {} labels to {}", pipeline.labels().len(), labels_path.display());
    }

    log::info!(
        "{} rows written, FQS {:.1}, CSC {:.1}/h, risk {:.2}",
        output.rows.len(),
        output.scores.fqs,
        output.scores.csc,
        output.risk.score
    );

    Ok(())
}

fn cmd_validate(
    input: &Path,
    config: &PipelineConfig,
    input_format: InputFormat,
    json: bool,
) -> Result<(), FocusCliError> {
    let input_data = read_input(input)?;
    let (log, stats) = parse_event_bytes(&input_data, input_format.into())?;
    let flags = quality_flags(&log, config, stats.dropped_rows(), 0);

    let report = ValidationReport {
        total_rows: stats.total_rows,
        retained_rows: stats.retained_rows,
        dropped_rows: stats.dropped_rows(),
        missing_title: stats.missing_title,
        bad_timestamp: stats.bad_timestamp,
        malformed_records: stats.malformed_records,
        quality_flags: flags,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:     {}", report.total_rows);
        println!("Retained rows:  {}", report.retained_rows);
        println!("Dropped rows:   {}", report.dropped_rows);

        if report.dropped_rows > 0 {
            println!("  - missing title:     {}", report.missing_title);
            println!("  - bad timestamp:     {}", report.bad_timestamp);
            println!("  - malformed records: {}", report.malformed_records);
        }
        if !report.quality_flags.is_empty() {
            println!("\nQuality flags:");
            for flag in &report.quality_flags {
                println!("  - {}", serde_json::to_string(flag)?.trim_matches('"'));
            }
        }
    }

    if report.retained_rows == 0 {
        Err(FocusCliError::NoEvents)
    } else if report.dropped_rows > 0 {
        Err(FocusCliError::ValidationFailed(report.dropped_rows))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, labels: Option<&Path>, json: bool) -> Result<(), FocusCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, VERSION),
    });

    checks.push(DoctorCheck {
        name: "report_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Run report schema: {}", REPORT_VERSION),
    });

    // Check configuration file if provided
    if let Some(config_path) = config {
        checks.push(check_file("config", config_path, |content| {
            PipelineConfig::from_json(content).map(|c| {
                format!(
                    "Config valid (interval {}s, K={}, T={}s, FQS over {:?})",
                    c.sampling_interval_secs,
                    c.unique_window_rows,
                    c.switch_window_secs,
                    c.fqs_denominator
                )
            })
        }));
    }

    // Check label file if provided
    if let Some(labels_path) = labels {
        checks.push(check_file("labels", labels_path, |content| {
            StaticLabelOracle::from_json(content)
                .map(|oracle| format!("Label file valid ({} titles)", oracle.len()))
        }));
    }

    // Check stdin is available (for piped input)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for -i -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Focus Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FocusCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_file<F>(name: &str, path: &Path, validate: F) -> DoctorCheck
where
    F: FnOnce(&str) -> Result<String, PipelineError>,
{
    if !path.exists() {
        return DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist", path.display()),
        };
    }

    let (status, message) = match fs::read_to_string(path) {
        Ok(content) => match validate(&content) {
            Ok(message) => (CheckStatus::Ok, message),
            Err(e) => (CheckStatus::Error, format!("Invalid {name} file: {e}")),
        },
        Err(e) => (CheckStatus::Error, format!("Cannot read {name} file: {e}")),
    };

    DoctorCheck {
        name: name.to_string(),
        status,
        message,
    }
}

fn cmd_schema(schema_type: SchemaType, json: bool) -> Result<(), FocusCliError> {
    match schema_type {
        SchemaType::Input => {
            if json {
                let schema = serde_json::json!({
                    "columns": [TIMESTAMP_COLUMN, TITLE_COLUMN],
                    "formats": ["csv", "ndjson"],
                    "timestamp_layouts": [
                        "YYYY-MM-DD HH:MM:SS[.fff]",
                        "YYYY-MM-DDTHH:MM:SS[.fff]",
                        "RFC 3339"
                    ]
                });
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                println!("Input: window-focus log");
                println!();
                println!("- {}: sample time (local wall clock)", TIMESTAMP_COLUMN);
                println!("  YYYY-MM-DD HH:MM:SS[.fff], YYYY-MM-DDTHH:MM:SS[.fff] or RFC 3339");
                println!("- {}: focused window title", TITLE_COLUMN);
                println!();
                println!("Rows with a blank title or unparseable timestamp are dropped.");
                println!("Extra columns are ignored.");
            }
        }
        SchemaType::Output => {
            if json {
                let schema = serde_json::json!({
                    "columns": EnrichedRow::COLUMNS,
                    "categories": ["High Load", "Communication", "Low Load", "Unclassified"],
                    "ranges": {
                        "FQS_Score": [0, 100],
                        "CSC_Score": [0, null],
                        "Risk_Score": [0, 10]
                    }
                });
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                println!("Output: enriched table ({} columns)", EnrichedRow::COLUMNS.len());
                println!();
                for column in EnrichedRow::COLUMNS {
                    println!("- {}", column);
                }
                println!();
                println!("FQS_Score, CSC_Score and Risk_Score are log-level values");
                println!("broadcast to every row.");
            }
        }
    }
    Ok(())
}

// Helper functions

/// Config file (or defaults) with the `--interval` override applied
fn load_config(path: Option<&Path>, interval: Option<u32>) -> Result<PipelineConfig, FocusCliError> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };
    if let Some(interval) = interval {
        config.sampling_interval_secs = interval;
    }
    config.validate()?;
    Ok(config)
}

fn read_input(input: &Path) -> Result<Vec<u8>, FocusCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    } else if !input.exists() {
        Err(PipelineError::InputNotFound(input.to_path_buf()).into())
    } else {
        Ok(fs::read(input)?)
    }
}

fn write_output(output: &Path, data: &[u8]) -> Result<(), FocusCliError> {
    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(data)?;
        stdout.flush()?;
    } else {
        write_atomic(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum FocusCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for FocusCliError {
    fn from(e: io::Error) -> Self {
        FocusCliError::Io(e)
    }
}

impl From<PipelineError> for FocusCliError {
    fn from(e: PipelineError) -> Self {
        FocusCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for FocusCliError {
    fn from(e: serde_json::Error) -> Self {
        FocusCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FocusCliError> for CliError {
    fn from(e: FocusCliError) -> Self {
        match e {
            FocusCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FocusCliError::Pipeline(e) => {
                let (code, hint) = match &e {
                    PipelineError::InputNotFound(_) => ("INPUT_NOT_FOUND", "Check the --input path"),
                    PipelineError::MissingColumn(_) => (
                        "MISSING_COLUMN",
                        "Input needs Timestamp and Window_Title columns; run 'focus schema input'",
                    ),
                    PipelineError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'focus doctor --config <file>' for details")
                    }
                    PipelineError::Csv(_) | PipelineError::ParseError(_) => {
                        ("PARSE_ERROR", "Run 'focus validate' for details")
                    }
                    PipelineError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    PipelineError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    PipelineError::EncodingError(_) => {
                        ("ENCODING_ERROR", "Check the output path")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FocusCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FocusCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No usable rows found in input".to_string(),
                hint: Some("Ensure rows have a timestamp and a non-blank title".to_string()),
            },
            FocusCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows would be dropped", count),
                hint: Some("Fix or remove the malformed rows and retry".to_string()),
            },
            FocusCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: None,
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    retained_rows: usize,
    dropped_rows: usize,
    missing_title: usize,
    bad_timestamp: usize,
    malformed_records: usize,
    quality_flags: Vec<QualityFlag>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
