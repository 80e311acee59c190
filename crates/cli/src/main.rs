// hypomatch CLI - compare kinematic-fit hypotheses event by event

mod compare;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use compare::{CompareArgs, ReportArgs};
use exit_codes::{ErrorOutput, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "hypomatch")]
#[command(about = "Compare competing kinematic-fit hypotheses event by event")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a primary hypothesis against one or more secondaries
    #[command(after_help = "\
Examples:
  hypomatch compare --primary hyp1.csv --primary-table hyp1 \\
      --secondary hyp2.csv --secondary-table hyp2
  hypomatch compare --primary 'hyp1/*.csv' --primary-table hyp1 \\
      --secondary hyp2.csv --secondary-table hyp2 \\
      --secondary hyp3.csv --secondary-table hyp3 \\
      --scheme by-event-and-beam --logging -o matched.csv")]
    Compare(CompareArgs),

    /// Run a comparison from a TOML config file
    #[command(after_help = "\
Examples:
  hypomatch run compare.toml
  hypomatch run compare.toml --json
  hypomatch run compare.toml --summary-out summary.json")]
    Run {
        /// Path to the .toml config file
        config: PathBuf,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Validate a config without touching any dataset
    Validate {
        /// Path to the .toml config file
        config: PathBuf,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let json = match &cli.command {
        Commands::Compare(args) => args.report.json,
        Commands::Run { report, .. } => report.json,
        Commands::Validate { .. } => false,
    };

    let result = match cli.command {
        Commands::Compare(args) => compare::cmd_compare(args),
        Commands::Run { config, report } => compare::cmd_run(config, report),
        Commands::Validate { config } => compare::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            ErrorOutput::new(code, &message).print(json);
            if let Some(hint) = hint {
                if !json {
                    eprintln!("hint:  {}", hint);
                }
            }
            ExitCode::from(code)
        }
    }
}
