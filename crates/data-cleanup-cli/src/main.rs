mod commands;
mod logging;
mod progress;

use std::process;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::{Cli, Commands, RunArgs};
use data_cleanup_core::config::{config_schema, write_config_schema};
use data_cleanup_core::lock::RunLock;
use data_cleanup_core::remote::{env_or_unknown, RemoteConfigSource, COMP_ID_VAR, RIG_ID_VAR};
use data_cleanup_core::{CleanupConfig, CleanupEngine, ConfigLoader, DocDbCatalog, APP_NAME};
use dotenv::dotenv;
use progress::CliReporter;
use serde_json::{Map, Value};
use tracing::field::Empty;
use tracing::{debug, error, info, info_span, Span};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let guard = logging::init_logger();
    logging::install_panic_hook();

    let result = match args.command {
        Some(Commands::Run(run_args)) => run_cleanup(&run_args),
        Some(Commands::ConfigSchema { output }) => print_config_schema(output.as_deref()),
        Some(Commands::PrintConfig(run_args)) => print_config(&run_args),
        None => run_cleanup(&RunArgs::default()),
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

fn run_span() -> Span {
    info_span!(
        "run",
        rig_id = %env_or_unknown(RIG_ID_VAR),
        comp_id = %env_or_unknown(COMP_ID_VAR),
        software = APP_NAME,
        version = env!("CARGO_PKG_VERSION"),
        logserver_url = Empty,
    )
}

/// Fill in the parts of the run context that only the resolved config knows.
fn record_run_context(span: &Span, config: &CleanupConfig) {
    if let Some(url) = &config.logserver_url {
        span.record("logserver_url", url.as_str());
    }
}

fn run_cleanup(args: &RunArgs) -> anyhow::Result<()> {
    let span = run_span();
    let _enter = span.enter();

    // The lock path is itself configurable, so config comes first.
    let config = resolve_config(args)?;
    record_run_context(&span, &config);
    let _lock = RunLock::acquire(&config.lock_path())?;

    debug!(config = ?config, "Starting {}", APP_NAME);

    let catalog = DocDbCatalog::new(&config.catalog).context("Could not create catalog client")?;
    let engine = CleanupEngine::new(config, catalog);
    let reporter = CliReporter::new();
    let report = engine.run(&reporter)?;

    println!();
    let verb = if report.dry_run { "Identified" } else { "Deleted" };
    let count = if report.dry_run {
        report.datasets_deletable
    } else {
        report.datasets_deleted
    };
    info!(
        "{} {} of {} datasets, {} subfolders, {} MB freed",
        verb,
        format!("{}", count).green(),
        format!("{}", report.datasets_found).cyan(),
        format!("{}", report.subfolders_deleted).green(),
        format!("{:.2}", report.freed_mb).green(),
    );
    if report.failures > 0 {
        info!(
            "{} folders could not be removed",
            format!("{}", report.failures).red()
        );
    }

    Ok(())
}

/// Remote config (degrading to nothing on failure) merged with local layers and CLI flags.
fn resolve_config(args: &RunArgs) -> anyhow::Result<CleanupConfig> {
    let remote = if args.no_remote_config {
        Map::new()
    } else {
        info!("Fetching config from server");
        fetch_remote_config()
    };

    ConfigLoader::new()
        .load(&remote, &args.overrides())
        .context("Could not build configuration")
}

fn fetch_remote_config() -> Map<String, Value> {
    match RemoteConfigSource::from_env(APP_NAME).fetch() {
        Ok(remote) => remote,
        Err(err) => {
            error!("Failed to fetch config data: {}", err);
            Map::new()
        }
    }
}

fn print_config_schema(output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let text = match output {
        Some(path) => write_config_schema(path)
            .with_context(|| format!("Could not write schema to {}", path.display()))?,
        None => serde_json::to_string_pretty(&config_schema())?,
    };
    println!("{}", text);
    Ok(())
}

fn print_config(args: &RunArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
