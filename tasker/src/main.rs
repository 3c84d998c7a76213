use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasker::api::{ApiServer, Backends};
use tasker::AppConfig;

#[derive(Parser)]
#[command(name = "tasker")]
#[command(about = "Multi-tenant task API with cached listings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start API server
    Serve {
        #[command(flatten)]
        config: AppConfig,
    },

    /// Check store and cache connectivity, then exit
    Check {
        #[command(flatten)]
        config: AppConfig,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tasker=info,tasker_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            config.validate()?;
            ApiServer::new(config).start().await?;
        }

        Commands::Check { config } => {
            let backends = Backends::connect(&config).await?;

            backends.tasks.ping().await?;
            println!("store: ok");

            match &backends.cache {
                None => println!("cache: disabled"),
                Some(cache) => match cache.ping().await {
                    Ok(()) => println!("cache: ok ({})", cache.backend()),
                    Err(e) => {
                        warn!("Cache ping failed: {}", e);
                        println!("cache: unreachable ({}): {}", cache.backend(), e);
                    }
                },
            }

            info!("Connectivity check finished");
        }
    }

    Ok(())
}
