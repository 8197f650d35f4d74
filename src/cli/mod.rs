use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;

pub mod commands;

/// Triage suggested reminders from the terminal.
#[derive(Parser, Debug)]
#[command(name = "remindtri", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file to use instead of the platform config dir [env: REMINDTRI_CONFIG]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding reminders.db [env: REMINDTRI_DATA]
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log filter for stderr, e.g. `debug` or `reminder_triage=trace`.
    /// Falls back to RUST_LOG, then `warn`.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Flags win over whatever the environment already holds.
    fn export_overrides(&self) {
        if let Some(path) = &self.config {
            env::set_var(CONFIG_ENV, path);
        }
        if let Some(path) = &self.data_dir {
            env::set_var(DATA_ENV, path);
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the interactive triage shell (default)
    Shell,
    /// Print the persisted upcoming reminders
    List,
    /// Fetch and print a batch of suggestions without accepting any
    Suggest,
    /// Show notifications that are currently scheduled
    Pending,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.export_overrides();

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(cli.log_level.as_deref()).context("initialising logging")?;
    let config = loader.load_or_init()?;
    tracing::debug!(
        config = %loader.paths().config_file.display(),
        database = %config.storage.database_path.display(),
        "configuration loaded"
    );

    let storage = storage::init(&config.storage)?;
    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => commands::run_shell(&config, storage),
        Commands::List => commands::list_upcoming(&config, storage),
        Commands::Suggest => commands::print_suggestions(&config),
        Commands::Pending => commands::list_pending(&config, storage),
    }
}

fn init_tracing(filter: Option<&str>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = match filter {
            Some(directives) => EnvFilter::try_new(directives)
                .with_context(|| format!("invalid log filter '{directives}'"))?,
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_defaults_to_the_shell() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["remindtri"])?;
        assert!(cli.command.is_none());
        assert!(cli.log_level.is_none());
        Ok(())
    }

    #[test]
    fn global_flags_precede_the_subcommand() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "remindtri",
            "--data-dir",
            "/tmp/remindtri",
            "--log-level",
            "reminder_triage=debug",
            "pending",
        ])?;
        assert_matches!(cli.command, Some(Commands::Pending));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/remindtri")));
        assert_eq!(cli.log_level.as_deref(), Some("reminder_triage=debug"));
        Ok(())
    }
}
