use clap::Parser;
use pair_vwap::cli::{show_config, Cli, Commands};
use pair_vwap::config::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing file means defaults; an unreadable or invalid one is an error
    let config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("Warning: {} not found, using default configuration", cli.config);
        Config::default()
    };

    pair_vwap::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting live mode");
            args.execute(config).await?;
        }
        Commands::Replay(args) => {
            tracing::info!("Starting replay");
            args.execute(config).await?;
        }
        Commands::Config => show_config(&config),
    }

    Ok(())
}
