use indexmap::IndexSet;
use tracing::info;

use crate::config::CollectorConfig;
use crate::error::Result;
use crate::store::TableStore;
use crate::traits::AuctionSite;

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Make/model combinations searched
    pub pairs: usize,
    /// Distinct listings found across all searches
    pub discovered: usize,
    /// Listings scraped because the table did not have them yet
    pub fresh: usize,
    /// Rows in the table after saving
    pub rows: usize,
}

pub struct Collector<S: AuctionSite> {
    site: S,
    store: TableStore,
    config: CollectorConfig,
}

impl<S: AuctionSite> Collector<S> {
    pub fn new(site: S, store: TableStore, config: CollectorConfig) -> Self {
        Self {
            site,
            store,
            config,
        }
    }

    /// Runs every stage once and rewrites the table.
    ///
    /// Listings already in the table are never visited again. Any error
    /// aborts the run before the table is written, leaving the previous file
    /// in place.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let pairs = self
            .site
            .resolve_make_models(&self.config.makes, &self.config.models, self.config.match_strategy)
            .await?;

        info!("Found the following make/model combinations to search:");
        for pair in &pairs {
            info!("- {}", pair);
        }

        let mut discovered = IndexSet::new();
        for pair in &pairs {
            discovered.extend(self.site.collect_listing_uris(pair).await?);
        }
        info!("Total number of listing URIs found: {}", discovered.len());

        let mut table = self.store.load()?;
        let known = table.identifiers();
        let fresh: Vec<&String> = discovered.iter().filter(|uri| !known.contains(*uri)).collect();
        info!("Listings not yet in {}: {}", self.store.path().display(), fresh.len());

        let mut records = Vec::with_capacity(fresh.len());
        for uri in &fresh {
            info!("Scraping listing '{}'", uri);
            records.push(self.site.scrape_listing(uri).await?);
        }

        let appended = table.merge(&records);
        self.store.save(&table)?;

        if appended > 0 {
            info!("Added {} new listings; table has {} columns", appended, table.columns().len());
        } else {
            info!("No new listings found");
        }

        Ok(RunSummary {
            pairs: pairs.len(),
            discovered: discovered.len(),
            fresh: appended,
            rows: table.len(),
        })
    }
}
