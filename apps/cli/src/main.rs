//! watchshots CLI: smartwatch screenshot dataset builder.
//!
//! Collects screenshots from public sources, files them by app/device
//! category, and writes a dataset summary.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = commands::load_app_config(&cli)?;
    commands::init_tracing(&cli, &config)?;
    commands::run(cli, config).await
}
