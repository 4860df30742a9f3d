use clap::{Args, Parser, Subcommand};
use data_cleanup_core::ConfigOverrides;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "data-cleanup")]
#[command(about = "Delete old session data that is safely recorded in the metadata catalog", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the data directory and delete (or list) eligible datasets
    Run(RunArgs),
    /// Print the JSON schema of the accepted configuration
    ConfigSchema {
        /// Also write the schema to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the resolved configuration values
    PrintConfig(RunArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Root folder holding rig/mouse/session directories
    #[arg(long)]
    pub data_directory: Option<PathBuf>,

    /// Minimum age in days before a cataloged session is deleted
    #[arg(long)]
    pub age_limit_days: Option<u32>,

    /// Upper age in days for the "old but not in catalog" warning
    #[arg(long)]
    pub too_old_for_warning_days: Option<u32>,

    /// Delete eligible datasets instead of only listing them
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub actually_delete: Option<bool>,

    /// Age limit for a named subfolder, as NAME=DAYS (repeatable)
    #[arg(long = "subfolder-age", value_parser = parse_subfolder_age)]
    pub subfolder_age: Vec<(String, u32)>,

    /// Lock file used to prevent overlapping runs
    #[arg(long)]
    pub lock_file: Option<PathBuf>,

    /// Skip fetching configuration from the config server
    #[arg(long)]
    pub no_remote_config: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_directory: self.data_directory.clone(),
            age_limit_days: self.age_limit_days,
            too_old_for_warning_days: self.too_old_for_warning_days,
            actually_delete: self.actually_delete,
            subfolder_age: self.subfolder_age.iter().cloned().collect(),
            lock_file: self.lock_file.clone(),
        }
    }
}

fn parse_subfolder_age(value: &str) -> Result<(String, u32), String> {
    let (name, days) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=DAYS, got '{}'", value))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing subfolder name in '{}'", value));
    }
    let days = days
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid day count in '{}': {}", value, e))?;
    Ok((name.to_string(), days))
}
