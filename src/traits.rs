//! Traits and configuration for auction-site scraping

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::WaitPolicy;
use crate::error::Result;
use crate::matching::MatchStrategy;
use crate::models::{ListingRecord, MakeModel};

/// Element ids and CSS selectors of the pages a site flow drives
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// Path of the advanced search page, relative to the base URL
    pub advanced_search_path: String,
    /// Id of the cookie consent button
    pub cookie_accept_button: String,
    /// Id of the make `<select>`
    pub make_select: String,
    /// Option text that clears the make filter
    pub make_placeholder: String,
    /// Id of the model `<select>`, whose options depend on the make
    pub model_select: String,
    /// Id of the search submit button
    pub search_button: String,
    /// Id of the results-per-page `<select>`
    pub results_per_page_select: String,
    /// Header holding the advertised result count as its first word
    pub result_count: String,
    /// Page-index links of a multi-page result set
    pub page_links: String,
    /// Anchors pointing at listing detail pages
    pub listing_links: String,
    /// Id of the current bid element on a listing page
    pub current_bid: String,
    /// Closing time text, rendered in parentheses
    pub closing_time: String,
    /// Location text; its parent anchor links to a map
    pub location_link: String,
    /// One row of the description table
    pub description_row: String,
    /// Label within a description row
    pub description_label: String,
    /// Value within a description row
    pub description_value: String,
}

/// Configuration for an auction-site scraper
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Display name for the website
    pub name: String,
    /// Base URL that relative links are resolved against
    pub base_url: String,
    pub selectors: SiteSelectors,
    /// Value chosen in the results-per-page control
    pub results_per_page: usize,
    /// Bound for regular element waits
    pub wait: WaitPolicy,
    /// Bound for the cookie banner, which is often absent
    pub cookie_wait: WaitPolicy,
    /// Dwell after navigation before reading asynchronously rendered content
    pub settle_delay: Duration,
    /// Dwell before the unfiltered model list is first counted
    pub model_settle_delay: Duration,
}

/// Trait for site-specific listing collection
#[async_trait]
pub trait AuctionSite: Send {
    /// Get the configuration for this site
    fn config(&self) -> &SiteConfig;

    /// Resolves candidate substrings into concrete make/model option pairs
    ///
    /// # Returns
    /// * `Result<Vec<MakeModel>>` - Deduplicated cross product of matching makes and models
    async fn resolve_make_models(
        &mut self,
        makes: &[String],
        models: &[String],
        strategy: MatchStrategy,
    ) -> Result<Vec<MakeModel>>;

    /// Collects every listing URI the search for `filter` returns
    ///
    /// Fails when the number of distinct URIs differs from the count the
    /// site advertises.
    async fn collect_listing_uris(&mut self, filter: &MakeModel) -> Result<Vec<String>>;

    /// Visits one listing and extracts its record
    async fn scrape_listing(&mut self, asset_uri: &str) -> Result<ListingRecord>;

    /// Resolves a site-relative link against the base URL
    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http") {
            return href.to_string();
        }
        let base = self.config().base_url.trim_end_matches('/');
        format!("{base}/{}", href.trim_start_matches('/'))
    }
}
