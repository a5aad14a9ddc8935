mod aggregator;
mod auth;
mod cli;
mod config;
mod error;
mod output;
mod pipeline;
mod providers;
mod scheduler;
#[cfg(test)]
mod testing;
mod versions;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    output::print_banner();

    info!("Starting Concourse Radiator");
    cli.execute(&config).await?;

    Ok(())
}
