//! `listmover` command line.
//!
//! ## Commands
//!
//! - `listmover run`: open the cart page, wait for the operator, migrate
//! - `listmover report`: compare a persisted run's snapshot with its ledger
//! - `listmover config`: print the effective configuration

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use listmover_core::MigrationConfig;
use listmover_core::config::ConfigError;
use listmover_core::config::ConfigLoader;
use listmover_core::config::ConfigOverrides;

pub mod config_cmd;
pub mod report_cmd;
pub mod run_cmd;

pub use config_cmd::ConfigArgs;
pub use report_cmd::ReportArgs;
pub use run_cmd::RunArgs;

/// Exit code for a run interrupted by Ctrl-C.
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Parser)]
#[command(name = "listmover", version, about = "Move cart and saved-for-later items into one list")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Migrate cart and saved-for-later items into the target list.
    Run(RunArgs),
    /// Summarize a persisted run.
    Report(ReportArgs),
    /// Print the effective configuration as TOML.
    Config(ConfigArgs),
}

impl Cli {
    /// Runs the selected command and returns the process exit code.
    pub async fn dispatch(self) -> anyhow::Result<i32> {
        match self.command {
            Command::Run(args) => run_cmd::run(args).await,
            Command::Report(args) => report_cmd::run(&args),
            Command::Config(args) => config_cmd::run(&args),
        }
    }
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the `info`
/// default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn load_config(
    file: Option<&PathBuf>,
    overrides: ConfigOverrides,
) -> Result<MigrationConfig, ConfigError> {
    let mut loader = ConfigLoader::new().with_overrides(overrides);
    if let Some(path) = file {
        loader = loader.with_file(path);
    }
    loader.load()
}
