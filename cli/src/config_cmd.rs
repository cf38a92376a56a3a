use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use listmover_core::config::ConfigOverrides;

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Config file (defaults to ./listmover.toml when present).
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,
}

pub fn run(args: &ConfigArgs) -> anyhow::Result<i32> {
    let config = crate::load_config(args.config.as_ref(), ConfigOverrides::default())
        .context("failed to load configuration")?;
    print!("{}", config.to_toml()?);
    Ok(0)
}
