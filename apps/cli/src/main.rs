//! Canonic CLI: resolve free-text requests against the company directory.
//!
//! Runs the entity resolution engine on one task and prints the annotated
//! security and solver views, plus a few inspection commands for the
//! underlying stores.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
