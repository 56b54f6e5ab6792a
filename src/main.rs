mod catalog;
mod collectors;
mod config;
mod db;
mod errors;
mod external;
mod jobs;
mod logging;
mod models;
mod planner;
mod risk;
mod services;

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use config::Config;
use external::{DefiLlamaClient, EtherscanClient};
use logging::{init_logging, LoggingConfig};
use services::job_scheduler_service::JobSchedulerService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env())?;

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let catalog_dir = PathBuf::from(&config.catalog_dir);
    planner::initialize_snapshots(&pool, &catalog_dir).await?;

    let explorer = Arc::new(EtherscanClient::new(config.etherscan_token.clone()));
    let oracle = Arc::new(DefiLlamaClient::default());

    let mut scheduler =
        JobSchedulerService::new(Arc::new(pool), explorer, oracle, catalog_dir).await?;
    scheduler.start().await?;

    tracing::info!("basel-tracker running, awaiting ctrl-c");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    scheduler.stop().await?;

    Ok(())
}
