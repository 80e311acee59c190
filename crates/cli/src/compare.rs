//! `hypomatch compare`, `run` and `validate`: cross-hypothesis comparison.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use hypomatch_compare::config::{CompareConfig, DatasetLocator};
use hypomatch_compare::matchlog::write_match_log_or_warn;
use hypomatch_compare::source::{write_augmented, CancelToken, LoadOptions};
use hypomatch_compare::{CompareError, CompareSummary, KeyScheme};

use crate::exit_codes::{compare_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_IO};
use crate::CliError;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SchemeArg {
    /// Best combo per event
    ByEvent,
    /// Best combo per (event, beam)
    ByEventAndBeam,
}

impl From<SchemeArg> for KeyScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::ByEvent => KeyScheme::ByEvent,
            SchemeArg::ByEventAndBeam => KeyScheme::ByEventAndBeam,
        }
    }
}

/// Flags shared by `compare` and `run`.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Print the JSON summary to stdout
    #[arg(long)]
    pub json: bool,

    /// Write the JSON summary to a file
    #[arg(long, value_name = "PATH")]
    pub summary_out: Option<PathBuf>,

    /// Abort loading a dataset after this many seconds
    #[arg(long, value_name = "SECS", env = "HYPOMATCH_LOAD_TIMEOUT")]
    pub load_timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Primary dataset file (path or glob)
    #[arg(long, value_name = "FILE")]
    pub primary: String,

    /// Primary table name
    #[arg(long, value_name = "NAME")]
    pub primary_table: String,

    /// Secondary dataset file (repeatable, paired with --secondary-table by position)
    #[arg(long = "secondary", value_name = "FILE", required = true)]
    pub secondaries: Vec<String>,

    /// Secondary table name (repeatable)
    #[arg(long = "secondary-table", value_name = "NAME", required = true)]
    pub secondary_tables: Vec<String>,

    /// Grouping key for reduction and matching
    #[arg(long, value_enum, default_value = "by-event")]
    pub scheme: SchemeArg,

    /// Keep every primary combo, not only the best per key
    #[arg(long)]
    pub preserve_combos: bool,

    /// Write one line per accepted match to the log file
    #[arg(long)]
    pub logging: bool,

    /// Match log destination
    #[arg(long, value_name = "PATH", default_value = hypomatch_compare::config::DEFAULT_LOG_FILE)]
    pub log_file: String,

    /// Output file ("placeholder" = <N>_hypothesesMatched.csv)
    #[arg(long, short = 'o', value_name = "PATH", default_value = hypomatch_compare::config::OUTPUT_PLACEHOLDER)]
    pub output: String,

    #[command(flatten)]
    pub report: ReportArgs,
}

fn config_err(msg: impl Into<String>) -> CliError {
    CliError { code: EXIT_CONFIG, message: msg.into(), hint: None }
}

impl From<CompareError> for CliError {
    fn from(err: CompareError) -> Self {
        let code = compare_exit_code(&err);
        let hint = match &err {
            CompareError::MissingColumn { .. } => Some(format!(
                "datasets need columns: {}",
                hypomatch_compare::model::REQUIRED_COLUMNS.join(", ")
            )),
            CompareError::TimedOut { .. } => Some("raise --load-timeout-secs".to_string()),
            CompareError::Logic(_) => Some("this is a bug; please report it".to_string()),
            _ => None,
        };
        CliError { code, message: err.to_string(), hint }
    }
}

/// Build a config from command-line flags.
pub fn config_from_args(args: &CompareArgs) -> Result<CompareConfig, CliError> {
    if args.secondaries.len() != args.secondary_tables.len() {
        return Err(config_err(format!(
            "{} --secondary file(s) but {} --secondary-table name(s)",
            args.secondaries.len(),
            args.secondary_tables.len(),
        ))
        .with_hint("give one --secondary-table per --secondary, in the same order"));
    }

    let secondaries = args
        .secondaries
        .iter()
        .zip(&args.secondary_tables)
        .map(|(file, table)| DatasetLocator::new(file.as_str(), table.as_str()))
        .collect();

    let mut config =
        CompareConfig::new(DatasetLocator::new(args.primary.as_str(), args.primary_table.as_str()), secondaries);
    config.scheme = args.scheme.into();
    config.preserve_combos = args.preserve_combos;
    config.logging = args.logging;
    config.log_file = args.log_file.clone();
    config.output = args.output.clone();
    config.validate()?;
    Ok(config)
}

pub fn cmd_compare(args: CompareArgs) -> Result<(), CliError> {
    let config = config_from_args(&args)?;
    execute(&config, &args.report)
}

pub fn cmd_run(config_path: PathBuf, report: ReportArgs) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    execute(&config, &report)
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: primary '{}' against {} secondary dataset(s), scheme {}",
        config.primary.table,
        config.secondaries.len(),
        config.scheme,
    );
    Ok(())
}

/// Read a TOML config. Relative paths resolve against the config's directory.
fn read_config(config_path: &Path) -> Result<CompareConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: format!("cannot read config {}: {e}", config_path.display()),
        hint: None,
    })?;
    let mut config = CompareConfig::from_toml(&config_str)?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base_dir);
    Ok(config)
}

fn load_options(report: &ReportArgs) -> LoadOptions {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\ninterrupted, cancelling load...");
        handler_token.cancel();
    })
    .ok();

    LoadOptions {
        cancel: Some(cancel),
        timeout: report.load_timeout_secs.map(Duration::from_secs),
    }
}

fn execute(config: &CompareConfig, report: &ReportArgs) -> Result<(), CliError> {
    let options = load_options(report);
    let input = hypomatch_compare::load_input(config, &options)?;
    let outcome = hypomatch_compare::run(config, &input)?;

    // Serialize before writing anything so a failure leaves no output behind.
    let json_str = serde_json::to_string_pretty(&outcome.summary)
        .map_err(|e| CliError { code: EXIT_ERROR, message: format!("JSON serialization error: {e}"), hint: None })?;

    // The summary is staged next to its destination and moved into place only
    // after the output, so a failed run leaves neither file behind.
    let staged = match report.summary_out {
        Some(ref path) => Some(stage_summary(path, &json_str)?),
        None => None,
    };

    let output_path = config.output_path();
    if let Err(e) = write_augmented(&output_path, &outcome.table) {
        if let Some((ref tmp, _)) = staged {
            let _ = std::fs::remove_file(tmp);
        }
        return Err(e.into());
    }

    if let Some((tmp, path)) = staged {
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            let _ = std::fs::remove_file(&output_path);
            return Err(CliError {
                code: EXIT_IO,
                message: format!("cannot write summary {}: {e}", path.display()),
                hint: None,
            });
        }
        eprintln!("wrote {}", path.display());
    }
    eprintln!("wrote {}", output_path.display());

    if config.logging {
        write_match_log_or_warn(Path::new(&config.log_file), &outcome.results);
    }

    if report.json {
        println!("{json_str}");
    }

    print_summary(&outcome.summary);
    Ok(())
}

/// Write the summary JSON to a sibling temp file of `path`.
fn stage_summary<'p>(path: &'p Path, json_str: &str) -> Result<(PathBuf, &'p Path), CliError> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json_str).map_err(|e| CliError {
        code: EXIT_IO,
        message: format!("cannot write summary {}: {e}", path.display()),
        hint: None,
    })?;
    Ok((tmp, path))
}

/// Human summary to stderr.
fn print_summary(s: &CompareSummary) {
    eprintln!(
        "{} ({} rows, {} best) vs {} hypothesis(es) [{}]: {} matches, {} rows written",
        s.primary.table,
        s.primary.rows,
        s.primary.best_candidates,
        s.secondaries.len(),
        s.meta.scheme,
        s.total_matches,
        s.output_rows,
    );
    for sec in &s.secondaries {
        eprintln!(
            "  {}: {} rows, {} best: {} matched, {} run mismatches, {} absent, {} zero ndf",
            sec.table,
            sec.rows,
            sec.best_candidates,
            sec.stats.matches,
            sec.stats.run_mismatches,
            sec.stats.absent,
            sec.stats.zero_ndf,
        );
    }
}
