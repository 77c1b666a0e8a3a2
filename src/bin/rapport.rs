//! Rapport CLI - Command-line interface for Synheart Rapport
//!
//! Commands:
//! - score: Aggregate and score one relationship's records
//! - timeline: Project records into a charting time series
//! - compare: Compare every relationship a user has logged
//! - goals: Derive boundary goals from a baseline
//! - validate: Check records against the 1-10 scale and duration rules
//! - doctor: Diagnose configuration and environment

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use synheart_rapport::pipeline::parse_timestamp;
use synheart_rapport::types::{BaselinePreferences, InteractionRecord};
use synheart_rapport::{
    project_time_series, EngineConfig, GoalGenerator, InMemoryStore, RapportProcessor, TimeWindow,
    PRODUCER_NAME, RAPPORT_VERSION,
};

/// Rapport - Relationship health analytics over logged interactions
#[derive(Parser)]
#[command(name = "rapport")]
#[command(author = "Synheart AI Inc")]
#[command(version = RAPPORT_VERSION)]
#[command(about = "Score, compare and track relationship health", long_about = None)]
struct Cli {
    /// Enable debug logging on stderr (overridden by RAPPORT_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate and score one relationship's records
    Score {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Time window (week, month, quarter, year); all records when omitted
        #[arg(short, long)]
        window: Option<TimeWindow>,

        /// Evaluation instant (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Project records into a time-ordered charting series
    Timeline {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Compare every relationship one user has logged
    Compare {
        /// Input file path holding all of the user's records (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// User whose relationships are compared
        #[arg(short, long)]
        user: String,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Time window (week, month, quarter, year); all records when omitted
        #[arg(short, long)]
        window: Option<TimeWindow>,

        /// Evaluation instant (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Derive boundary goals from a baseline
    Goals {
        /// Baseline JSON file (use - for stdin)
        #[arg(short, long)]
        baseline: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate interaction records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check an engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one item per line)
    Ndjson,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

/// Logs go to stderr so stdout stays machine-readable
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("RAPPORT_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), RapportCliError> {
    match cli.command {
        Commands::Score {
            input,
            input_format,
            output_format,
            window,
            now,
            config,
        } => cmd_score(
            &input,
            input_format,
            output_format,
            window,
            now.as_deref(),
            config.as_deref(),
        ),

        Commands::Timeline {
            input,
            input_format,
            output_format,
        } => cmd_timeline(&input, input_format, output_format),

        Commands::Compare {
            input,
            user,
            input_format,
            output_format,
            window,
            now,
            config,
        } => cmd_compare(
            &input,
            &user,
            input_format,
            output_format,
            window,
            now.as_deref(),
            config.as_deref(),
        ),

        Commands::Goals {
            baseline,
            output_format,
            config,
        } => cmd_goals(&baseline, output_format, config.as_deref()),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_score(
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    window: Option<TimeWindow>,
    now: Option<&str>,
    config: Option<&Path>,
) -> Result<(), RapportCliError> {
    let records = read_records(input, &input_format)?;
    let now = resolve_now(now)?;

    let processor = RapportProcessor::with_config(InMemoryStore::new(), load_config(config)?)?;
    let health = processor.analyze(&records, window, now)?;
    tracing::info!(
        records = records.len(),
        score = health.snapshot.score,
        tier = health.snapshot.risk_tier.as_str(),
        "scored relationship"
    );

    print!("{}", format_output(std::slice::from_ref(&health), &output_format)?);
    Ok(())
}

fn cmd_timeline(
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
) -> Result<(), RapportCliError> {
    let records = read_records(input, &input_format)?;
    for record in &records {
        record.validate()?;
    }

    let series = project_time_series(&records);
    print!("{}", format_output(&series, &output_format)?);
    Ok(())
}

fn cmd_compare(
    input: &Path,
    user: &str,
    input_format: InputFormat,
    output_format: OutputFormat,
    window: Option<TimeWindow>,
    now: Option<&str>,
    config: Option<&Path>,
) -> Result<(), RapportCliError> {
    let records = read_records(input, &input_format)?;
    let now = resolve_now(now)?;

    let store = InMemoryStore::with_interactions(records)?;
    let processor = RapportProcessor::with_config(store, load_config(config)?)?;
    let report = processor.compare_user_relationships(user, window, now)?;
    tracing::info!(
        user_id = user,
        relationships = report.relationship_count,
        "compared relationships"
    );

    print!("{}", format_output(std::slice::from_ref(&report), &output_format)?);
    Ok(())
}

fn cmd_goals(
    baseline: &Path,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), RapportCliError> {
    let content = read_input(baseline)?;
    let baseline: BaselinePreferences = serde_json::from_str(&content)?;

    let generator = GoalGenerator::from_config(&load_config(config)?);
    let goals = generator.generate(&baseline);

    print!("{}", format_output(&goals, &output_format)?);
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), RapportCliError> {
    let records = read_records(input, &input_format)?;

    let errors: Vec<ValidationErrorDetail> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            record.validate().err().map(|e| ValidationErrorDetail {
                index,
                record_id: record.id.clone(),
                error: e.to_string(),
            })
        })
        .collect();

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - errors.len(),
        invalid_records: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Record {} (index {}): {}", err.record_id, err.index, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(RapportCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), RapportCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "rapport_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Rapport version {}", RAPPORT_VERSION),
    });

    let config_check = match config {
        Some(path) if !path.exists() => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        },
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => match EngineConfig::from_json(&content) {
                Ok(loaded) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (risk tiers {}/{}/{}, top {} symptoms)",
                        loaded.risk.low, loaded.risk.medium, loaded.risk.high, loaded.symptom_top_n
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {}", e),
                },
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            },
        },
        None => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        },
    };
    checks.push(config_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: RAPPORT_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Rapport Doctor Report");
        println!("=====================");
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
        Err(RapportCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(path: &Path) -> Result<String, RapportCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn read_records(
    path: &Path,
    format: &InputFormat,
) -> Result<Vec<InteractionRecord>, RapportCliError> {
    let data = read_input(path)?;
    let records = parse_records(&data, format)?;
    tracing::debug!(records = records.len(), "read interaction records");
    Ok(records)
}

fn parse_records(
    data: &str,
    format: &InputFormat,
) -> Result<Vec<InteractionRecord>, RapportCliError> {
    match format {
        InputFormat::Json => Ok(serde_json::from_str(data)?),
        InputFormat::Ndjson => data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line.trim()).map_err(|e| {
                    RapportCliError::ParseError(format!("Line {}: {}", n + 1, e))
                })
            })
            .collect(),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, RapportCliError> {
    match path {
        Some(path) => {
            let config = EngineConfig::from_json(&fs::read_to_string(path)?)?;
            tracing::debug!(path = %path.display(), "loaded engine config");
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// The only place the wall clock is read
fn resolve_now(now: Option<&str>) -> Result<DateTime<Utc>, RapportCliError> {
    match now {
        Some(value) => Ok(parse_timestamp(value)?),
        None => Ok(Utc::now()),
    }
}

fn format_output<T: Serialize>(
    items: &[T],
    format: &OutputFormat,
) -> Result<String, RapportCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => match items {
            [single] => Ok(serde_json::to_string(single)? + "\n"),
            _ => Ok(serde_json::to_string(items)? + "\n"),
        },
        OutputFormat::JsonPretty => match items {
            [single] => Ok(serde_json::to_string_pretty(single)? + "\n"),
            _ => Ok(serde_json::to_string_pretty(items)? + "\n"),
        },
    }
}

// Error types

#[derive(Debug)]
enum RapportCliError {
    Io(io::Error),
    Compute(synheart_rapport::ComputeError),
    Json(serde_json::Error),
    Validation(synheart_rapport::validation::ValidationError),
    MixedRelationships(usize),
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for RapportCliError {
    fn from(e: io::Error) -> Self {
        RapportCliError::Io(e)
    }
}

impl From<synheart_rapport::ComputeError> for RapportCliError {
    fn from(e: synheart_rapport::ComputeError) -> Self {
        match e {
            synheart_rapport::ComputeError::MixedRelationships(count) => {
                RapportCliError::MixedRelationships(count)
            }
            other => RapportCliError::Compute(other),
        }
    }
}

impl From<serde_json::Error> for RapportCliError {
    fn from(e: serde_json::Error) -> Self {
        RapportCliError::Json(e)
    }
}

impl From<synheart_rapport::validation::ValidationError> for RapportCliError {
    fn from(e: synheart_rapport::validation::ValidationError) -> Self {
        RapportCliError::Validation(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RapportCliError> for CliError {
    fn from(e: RapportCliError) -> Self {
        match e {
            RapportCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RapportCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'rapport validate' on the input".to_string()),
            },
            RapportCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RapportCliError::Validation(e) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'rapport validate' for details".to_string()),
            },
            RapportCliError::MixedRelationships(count) => CliError {
                code: "MIXED_RELATIONSHIPS".to_string(),
                message: format!("Input holds records for {} relationships", count),
                hint: Some("Use 'rapport compare' for more than one relationship".to_string()),
            },
            RapportCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            RapportCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            RapportCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    record_id: String,
    error: String,
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
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let data = concat!(
            r#"{"id":"a","user_id":"u1","relationship_id":"r","created_at":"2024-01-01T00:00:00Z"}"#,
            "\n\n",
            r#"{"id":"b","user_id":"u1","relationship_id":"r","created_at":"2024-01-02T00:00:00Z"}"#,
            "\n"
        );
        let records = parse_records(data, &InputFormat::Ndjson).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, "b");
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let err = parse_records("{}\n", &InputFormat::Ndjson).unwrap_err();
        match err {
            RapportCliError::ParseError(msg) => assert!(msg.starts_with("Line 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_now_explicit() {
        let now = resolve_now(Some("2024-06-30T12:00:00Z")).unwrap();
        assert_eq!(now.to_rfc3339(), "2024-06-30T12:00:00+00:00");
        assert!(resolve_now(Some("yesterday")).is_err());
    }

    #[test]
    fn test_format_output_single_item_is_object() {
        let out = format_output(&[serde_json::json!({"a": 1})], &OutputFormat::Json).unwrap();
        assert_eq!(out, "{\"a\":1}\n");

        let out = format_output(&[1, 2], &OutputFormat::Ndjson).unwrap();
        assert_eq!(out, "1\n2\n");
    }

    #[test]
    fn test_mixed_relationships_get_compare_hint() {
        let err = RapportCliError::from(synheart_rapport::ComputeError::MixedRelationships(3));
        let cli = CliError::from(err);
        assert_eq!(cli.code, "MIXED_RELATIONSHIPS");
        assert!(cli.hint.unwrap().contains("rapport compare"));
    }
}
