/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::main
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Helm-Up Core. Queries the release catalog
    and the console update service, renders the update panel,
    and drives update/rollback actions to their terminal state.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTPS GET requests
    and explicit operator-initiated mutations only.

  Dependencies:
    clap for CLI parsing, chrono for timestamps.

  Operational Scope:
    Invoked by operators via `helm-up core` or standalone when
    inspecting or switching console versions.

  Revision History:
    2025-05-15 KSL  Authored Helm-Up Core runtime.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Helmport cadence
    - Configurable execution via CLI and config file
============================================================*/

mod action;
mod catalog;
mod config;
mod console;
mod error;
mod future;
mod logger;
mod panel;
mod version;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};

use action::ActionTracker;
use catalog::CatalogClient;
use config::HelmupConfig;
use console::ConsoleClient;
use error::{HelmupError, Result};
use logger::Logger;
use panel::{PanelController, PanelView};

/// Command-line arguments for Helm-Up-Core.
#[derive(Debug, Parser)]
#[command(
    name = "Helm-Up-Core",
    version,
    author = "Helmport Systems",
    about = "Console self-update panel for Helm-Up"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render the update panel once and exit.
    Status,
    /// Start an update to the best available version.
    Update {
        /// Target a specific catalog version instead.
        #[arg(long, value_name = "VERSION")]
        to: Option<String>,
    },
    /// Roll the console back to its bundled version.
    Rollback,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Helm-Up-Core] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = HelmupConfig::load_from_optional_path(cli.config.as_deref())?;

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .or_else(|| Some(config.log_dir().join(format!("core_{session_stamp}.log"))));
    let logger = Logger::new(log_path, cli.verbose)?;
    logger.info("INIT", "Helm-Up Core awakening.");

    let catalog = CatalogClient::new(&config.catalog)?;
    let console = ConsoleClient::new(&config.console)?;
    let tracker = ActionTracker::new(config.settle_delay());
    let local_build = config.local_client_build();
    logger.debug("INIT", format!("Local client build: {local_build}"));

    let mut controller = PanelController::new(catalog, console, tracker, local_build);

    let view = match cli.command {
        Command::Status => controller.mount(&logger).await,
        Command::Update { to } => {
            controller.mount(&logger).await;
            let target = resolve_target(&controller, to)?;
            logger.info("UPDATE", format!("Starting update to {target}"));
            controller.run_update(&target, &logger).await?
        }
        Command::Rollback => {
            controller.mount(&logger).await;
            logger.info("ROLLBACK", "Starting rollback to bundled version");
            controller.run_rollback(&logger).await?
        }
    };

    print!("{view}");
    log_outcome(&logger, &view);
    logger.info("COMPLETE", "Session closed.");
    logger.finalize()?;

    Ok(ExitCode::SUCCESS)
}

/// An update start needs a target: an explicit `--to` wins, else the
/// comparator's verdict; with neither there is nothing to do.
fn resolve_target(controller: &PanelController, requested: Option<String>) -> Result<String> {
    if let Some(version) = requested {
        return Ok(version);
    }
    controller
        .available_update()
        .map(|candidate| candidate.version)
        .ok_or_else(|| HelmupError::Runtime("No compatible update available".into()))
}

fn log_outcome(logger: &Logger, view: &PanelView) {
    match view {
        PanelView::Loading => logger.warn("PANEL", "Queries never settled"),
        PanelView::Fallback { client_build } => logger.warn(
            "PANEL",
            format!("Degraded view from local build {client_build}"),
        ),
        PanelView::Ready { available, .. } => match available {
            Some(row) => logger.info(
                "PANEL",
                format!("Update available: {}", row.display_version),
            ),
            None => logger.info("PANEL", "Console is up to date"),
        },
    }
}
