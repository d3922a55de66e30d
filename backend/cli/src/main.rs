mod check_cmd;
mod config_cmd;
mod console_cmd;
mod doctor_cmd;
mod runtime;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "srs-verifier")]
#[command(about = "Verify profile ownership with a one-time code placed in the profile bio")]
#[command(version)]
struct Cli {
    /// Config file (defaults to config.yaml in the config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one profile and look for a code in its bio
    Check {
        /// Profile handle
        #[arg(short, long)]
        profile: String,
        /// Six-digit code to look for
        #[arg(long)]
        code: String,
    },
    /// Read `verify <id> [handle]` commands from stdin and print outcomes
    Console,
    /// Print the effective config and validation report
    Config,
    /// Check that the verifier can start
    Doctor,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let path = cli
        .config
        .unwrap_or_else(|| verifier_config::config_file_path(&verifier_config::config_dir()));

    let (config, report) = verifier_config::load_and_prepare(&path).await?;
    logging::init_logger(&config.log_level(), config.log_dir().as_deref());
    info!(config = %path.display(), "srs-verifier starting");
    log_findings(&report);

    let ok = match cli.command {
        Commands::Config => {
            config_cmd::run(&config, &report, &path)?;
            report.is_valid()
        }
        Commands::Doctor => doctor_cmd::run(&config, &report).await?,
        Commands::Check { profile, code } => {
            ensure_valid(&report)?;
            check_cmd::run(&config, &profile, &code).await?
        }
        Commands::Console => {
            ensure_valid(&report)?;
            console_cmd::run(&config).await?;
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Config findings are collected before the logger exists, so they are
/// reported here instead of at load time.
fn log_findings(report: &verifier_config::ValidationReport) {
    for warning in &report.warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        error!(path = %error.path, message = %error.message, "Config error");
    }
}

fn ensure_valid(report: &verifier_config::ValidationReport) -> Result<()> {
    if let Some(first) = report.errors.first() {
        bail!("{} config error(s); first: {first}", report.errors.len());
    }
    Ok(())
}
