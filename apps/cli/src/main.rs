use anyhow::Context;
use clap::Parser;
use passio_cli::{Cli, init_logger, load_config, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("Configuration is malformed")?;
    let _logger = init_logger(&config.logging)?;

    run(cli, config, &mut std::io::stdout().lock()).await
}
