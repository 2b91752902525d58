/*
* Command Line Interface
* ----------------------
* Git-style subcommand CLI built on clap.
*
* Command Structure:
* slurm-ledger-sync
* ├── sync [--target <url>] [--debug]   // run the reconciliation pipeline
* └── init [--force]                    // generate default configuration
*
* `sync --debug` is a dry run: everything is computed, nothing is written
* to the remote ledger, and logs go to the debug log destination so a real
* run's log stays clean.
*
* A missing token file is "not configured yet", not an error: the run
* prints a notice, logs it, and exits with status 0 having done no work.
*/

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use crate::config::Settings;
use crate::core::RunContext;
use crate::errors::SyncResult;
use crate::sync;

#[derive(Parser)]
#[command(name = "slurm-ledger-sync")]
#[command(about = "Reconcile scheduler job accounting with a remote billing ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full reconciliation pipeline
    Sync {
        /// API endpoint to hit; should end with a trailing '/'
        #[arg(short, long)]
        target: Option<String>,

        /// Dry run: compute everything, push nothing to the ledger
        #[arg(short, long)]
        debug: bool,
    },
    /// Generate default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::new_from_file(path)?,
        None => Settings::new()?,
    };

    match cli.command {
        Commands::Sync { target, debug } => handle_sync_command(target, debug, &settings).await?,
        Commands::Init { force } => handle_init_command(force)?,
    }

    Ok(())
}

async fn handle_sync_command(
    target: Option<String>,
    debug: bool,
    settings: &Settings,
) -> anyhow::Result<()> {
    init_logging(settings, debug)?;

    if debug {
        println!("{}", "---DEBUG RUN---".yellow().bold());
    }

    let Some(ctx) = RunContext::build(settings, target, debug)? else {
        println!(
            "token file {} missing...",
            settings.auth.token_file.display()
        );
        info!(
            "auth token file missing [{}], exiting run...",
            settings.auth.token_file.display()
        );
        return Ok(());
    };

    println!("starting run, using endpoint {} ...", ctx.base_url);
    info!("starting run, using endpoint {} ...", ctx.base_url);

    let summary = sync::run(&ctx).await?;

    if ctx.dry_run {
        println!(
            "{} DEBUG run complete, collected {} jobs, updated 0 jobs.",
            "✓".green(),
            summary.parsed
        );
        info!("DEBUG run complete, updated 0 jobs.");
    } else {
        println!(
            "{} run complete, pushed/updated {} jobs ({} push failures, {} parse failures).",
            "✓".green(),
            summary.pushed,
            summary.push_failures,
            summary.parse_failures
        );
        info!("run complete, pushed/updated {} jobs.", summary.pushed);
    }

    Ok(())
}

/// Log to a file, appending across runs; dry runs get their own
/// destination so they never pollute the real run log.
fn init_logging(settings: &Settings, debug: bool) -> SyncResult<()> {
    let path = if debug {
        &settings.logging.debug_log_file
    } else {
        &settings.logging.log_file
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();

    Ok(())
}

fn handle_init_command(force: bool) -> anyhow::Result<()> {
    let config_dir = PathBuf::from("config");
    if config_dir.exists() && !force {
        eprintln!(
            "{} configuration directory already exists, use --force to overwrite",
            "✗".red()
        );
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    let default_config = crate::config::generate_default_config();
    let config_str = toml::to_string_pretty(&default_config)?;
    std::fs::write(config_dir.join("default.toml"), config_str)?;

    println!("{} Default configuration generated", "✓".green());
    Ok(())
}
