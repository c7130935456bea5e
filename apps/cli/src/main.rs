//! regreview CLI: procurement-oriented regulatory review documents.
//!
//! Looks a product up in the MFDS public device registry, interprets the
//! listing and writes a Markdown review for internal procurement reference.

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
