//! noterelay: enrich new users and write a summary note back to them.
//!
//! Receives "user created" webhooks, looks the user and their employer up
//! with the enrichment service, and stores a short note on the user.

mod commands;
mod server;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
