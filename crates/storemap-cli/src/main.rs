mod stores;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::stores::StoresCommands;

#[derive(Debug, Parser)]
#[command(name = "storemap-cli")]
#[command(about = "Store mirror maintenance: sync, geocode backfill, and cleanup")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database connectivity and schema
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect, sync, and delete mirrored stores
    Stores {
        #[command(subcommand)]
        command: StoresCommands,
    },
    /// List the chains known to the remote inventory API
    Chains,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("no command given; run `storemap-cli --help` for usage");
        return Ok(());
    };

    let config = storemap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Db { command } => run_db(&config, &command).await,
        Commands::Stores { command } => stores::run(&config, command).await,
        Commands::Chains => stores::run_chains(&config).await,
    }
}

async fn run_db(config: &storemap_core::AppConfig, command: &DbCommands) -> anyhow::Result<()> {
    let pool = storemap_db::connect_pool(
        &config.database_url,
        storemap_db::PoolConfig::from_app_config(config),
    )
    .await?;

    let result = match command {
        DbCommands::Ping => storemap_db::health_check(&pool)
            .await
            .map(|()| println!("database ok"))
            .map_err(anyhow::Error::from),
        DbCommands::Migrate => storemap_db::run_migrations(&pool)
            .await
            .map(|applied| println!("applied {applied} migration(s)"))
            .map_err(anyhow::Error::from),
    };

    pool.close().await;
    result
}
