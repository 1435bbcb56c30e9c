mod auth;
mod cli;
mod codepipeline;
mod config;
mod error;
mod event;
mod output;
mod router;
mod slack;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting pipeline-notify");
    cli.execute().await?;

    Ok(())
}
