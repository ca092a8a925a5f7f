use clap::{Parser, Subcommand};
use dependency_ratio_map::{
    config::AppConfig, data, render, server, session::MapSession, surface::LayerStore,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive proportional symbol map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render one PNG frame per year, plus the legend
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the year attributes and dataset statistics
    Stats {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let loaded = data::load_dataset(&app_config.input).await;
            server::start_server(app_config, loaded).await?;
        }
        Commands::Render { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let dataset = data::load_dataset(&app_config.input).await?;

            let frames = tokio::task::spawn_blocking(move || render::generate_frames(&app_config, &dataset))
                .await??;

            tracing::info!("Rendered {} frames", frames.len());
        }
        Commands::Stats { config } => {
            let app_config = AppConfig::load_from_file(config)?;
            let dataset = data::load_dataset(&app_config.input).await?;
            let session = MapSession::initialize(dataset, &app_config, LayerStore::default())?;

            println!("Years: {}", session.attributes().keys().join(", "));
            let stats = session.stats();
            println!("min:  {:.2}", stats.min);
            println!("max:  {:.2}", stats.max);
            println!("mean: {:.2}", stats.mean);
            for entry in &session.legend().entries {
                println!(
                    "legend {:<4} {:>8} radius {:.2}",
                    entry.statistic.name(),
                    entry.label,
                    entry.radius
                );
            }
        }
    }

    Ok(())
}
