use anyhow::Context;
use clap::Parser;
use log::info;
use osim_runtime::{KernelConfig, Runtime};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the kernel configuration file
    config: PathBuf,

    /// Log level, overrides the one in the configuration file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = KernelConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // RUST_LOG, when set, wins over the configured level.
    env_logger::Builder::new()
        .filter_level(config.level_filter())
        .parse_default_env()
        .init();

    info!(
        "starting kernel on port {} - algorithm {}",
        config.port, config.algorithm
    );
    Runtime::new(config)?.run().await?;

    Ok(())
}
