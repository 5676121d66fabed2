//! slack-batch - CSV driven Slack provisioning
//!
//! The main entry point for the `slack-batch` binary.

use anyhow::{Context, Result};
use clap::Parser;

use sb_cli::{commands, logging, Cli, Settings};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config_dir).context("failed to load settings")?;
    let _logging = logging::init(&settings)?;

    tracing::info!("Script starting");

    // rows run strictly in order, one task is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(commands::execute(cli.command, &settings))
}
