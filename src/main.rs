use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod browser;
mod collector;
mod config;
mod error;
mod matching;
mod models;
mod parsing;
mod scrapers;
mod store;
mod traits;

use browser::{BrowserSession, WaitPolicy};
use collector::{Collector, RunSummary};
use config::CollectorConfig;
use scrapers::govdeals::GovDealsSite;
use store::TableStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting auction collector");

    let config = CollectorConfig::from_env()?;
    let session = BrowserSession::connect(&config.webdriver_url, config.headless).await?;

    let outcome = collect(&session, &config).await;

    // The session is closed on every path, including failed runs
    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }

    match outcome {
        Ok(summary) => {
            info!(
                "Run complete: {} make/model pairs, {} listings found, {} new, {} rows in {}",
                summary.pairs,
                summary.discovered,
                summary.fresh,
                summary.rows,
                config.data_file.display()
            );
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

async fn collect(session: &BrowserSession, config: &CollectorConfig) -> error::Result<RunSummary> {
    let mut site_config = GovDealsSite::default_config(config.site_url.clone());
    site_config.results_per_page = config.results_per_page;
    site_config.wait = WaitPolicy::with_timeout(config.wait_timeout);

    let site = GovDealsSite::open(session, site_config).await?;
    let store = TableStore::new(&config.data_file);

    let mut collector = Collector::new(site, store, config.clone());
    collector.run().await
}
