use std::error::Error;

use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};

use github_search_scraper_lib::{logging, run_search, Args, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();

    let args = Args::parse();

    // Configuration must be complete before anything touches the network.
    let config = Config::from_env()?;
    logging::init(&config)?;

    match run_search(&args, &config).await {
        Ok(records) => {
            info!("Finished: {} results", records.len());
            Ok(())
        }
        Err(e) => {
            error!("Search failed: {}", e);
            Err(e.into())
        }
    }
}
