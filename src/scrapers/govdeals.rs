//! GovDeals.com specific site flow
//!
//! The make and model controls are two dependent `<select>` elements: picking
//! a make reloads the model options asynchronously. The flow detects that
//! reload by comparing the model option count against the count shown while
//! no make is selected.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexSet;
use scraper::{ElementRef, Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, WaitPolicy, wait_until};
use crate::error::{CollectorError, Result};
use crate::matching::{MatchStrategy, filter_options};
use crate::models::{ListingRecord, MakeModel};
use crate::parsing::{normalize_field_key, parse_closing_time, parse_current_bid, parse_result_count};
use crate::traits::{AuctionSite, SiteConfig, SiteSelectors};

pub const DEFAULT_BASE_URL: &str = "https://www.govdeals.com";

/// Site flow for GovDeals, driving a borrowed browser session
pub struct GovDealsSite<'s> {
    session: &'s BrowserSession,
    config: SiteConfig,
    /// Model option count while no make is selected, learned on first reset
    unfiltered_model_count: Option<usize>,
}

impl<'s> GovDealsSite<'s> {
    /// Default configuration for the site at `base_url`
    pub fn default_config(base_url: impl Into<String>) -> SiteConfig {
        SiteConfig {
            name: "GovDeals".to_string(),
            base_url: base_url.into(),
            selectors: SiteSelectors {
                advanced_search_path: "/advanced-search/".to_string(),
                cookie_accept_button: "onetrust-accept-btn-handler".to_string(),
                make_select: "make".to_string(),
                make_placeholder: "Select Make".to_string(),
                model_select: "model".to_string(),
                search_button: "btnAdvancedSearch".to_string(),
                results_per_page_select: "selectDisplayRows".to_string(),
                result_count: "#divResultsSectionHeader h5".to_string(),
                page_links: ".page-item a".to_string(),
                listing_links: r#"a[name="lnkAssetDetails"]"#.to_string(),
                current_bid: "currentBid".to_string(),
                closing_time: "app-ux-timer p span span".to_string(),
                location_link: "#lnkAssetDetailLocation".to_string(),
                description_row: "div.row.description-body".to_string(),
                description_label: "div h5".to_string(),
                description_value: "div p".to_string(),
            },
            results_per_page: 120,
            wait: WaitPolicy::default(),
            cookie_wait: WaitPolicy::with_timeout(Duration::from_secs(5)),
            settle_delay: Duration::from_secs(2),
            model_settle_delay: Duration::from_secs(5),
        }
    }

    /// Opens the site in `session` and dismisses the cookie banner.
    pub async fn open(session: &'s BrowserSession, config: SiteConfig) -> Result<Self> {
        info!("Opening {} at {}", config.name, config.base_url);
        session.goto(&config.base_url).await?;
        session.maximize().await?;

        let site = Self {
            session,
            config,
            unfiltered_model_count: None,
        };
        site.accept_cookies().await?;
        Ok(site)
    }

    async fn accept_cookies(&self) -> Result<()> {
        let button = &self.config.selectors.cookie_accept_button;
        match self.session.click_by_id(button, self.config.cookie_wait).await {
            Ok(()) => {
                info!("Accepted cookies");
                Ok(())
            }
            Err(CollectorError::Timeout { .. }) => {
                info!("Cookie banner not shown; likely already accepted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn reset_advanced_search(&self) -> Result<()> {
        let url = self.absolute_url(&self.config.selectors.advanced_search_path);
        self.session.goto(&url).await?;
        self.session
            .wait_displayed(&self.config.selectors.make_select, self.config.wait)
            .await
    }

    /// Clears the make filter and waits for the model list to show every model again.
    async fn reset_make(&mut self) -> Result<()> {
        let session = self.session;
        let selectors = &self.config.selectors;
        session
            .select_by_text(&selectors.make_select, &selectors.make_placeholder, self.config.wait)
            .await?;

        match self.unfiltered_model_count {
            Some(unfiltered) => {
                let model_select = selectors.model_select.as_str();
                wait_until(self.config.wait, "model list to reset", move || async move {
                    Ok(session.option_count(model_select).await? == Some(unfiltered))
                })
                .await
            }
            None => {
                debug!("First make reset, dwelling while the model list loads");
                sleep(self.config.model_settle_delay).await;
                let count = session
                    .option_texts(&selectors.model_select, self.config.wait)
                    .await?
                    .len();
                info!("Model list shows {} options without a make", count);
                self.unfiltered_model_count = Some(count);
                Ok(())
            }
        }
    }

    /// Selects `make` and waits for the dependent model list to reload.
    async fn select_make(&self, make: &str) -> Result<()> {
        let session = self.session;
        let selectors = &self.config.selectors;
        session
            .select_by_text(&selectors.make_select, make, self.config.wait)
            .await?;

        match self.unfiltered_model_count {
            Some(unfiltered) => {
                let model_select = selectors.model_select.as_str();
                wait_until(self.config.wait, "model list to reload", move || async move {
                    let count = session.option_count(model_select).await?;
                    Ok(count.is_some_and(|n| n != unfiltered))
                })
                .await
            }
            None => {
                warn!("Make selected before the model list was measured; dwelling instead");
                sleep(self.config.model_settle_delay).await;
                Ok(())
            }
        }
    }

    async fn select_model(&self, model: &str) -> Result<()> {
        self.session
            .select_by_text(&self.config.selectors.model_select, model, self.config.wait)
            .await
    }

    async fn select_results_per_page(&self) -> Result<()> {
        let option = format!("{} per page", self.config.results_per_page);
        self.session
            .select_by_text(&self.config.selectors.results_per_page_select, &option, self.config.wait)
            .await
    }

    async fn option_texts(&self, id: &str) -> Result<Vec<String>> {
        self.session.option_texts(id, self.config.wait).await
    }
}

#[async_trait]
impl<'s> AuctionSite for GovDealsSite<'s> {
    fn config(&self) -> &SiteConfig {
        &self.config
    }

    async fn resolve_make_models(
        &mut self,
        makes: &[String],
        models: &[String],
        strategy: MatchStrategy,
    ) -> Result<Vec<MakeModel>> {
        let make_select = self.config.selectors.make_select.clone();
        let model_select = self.config.selectors.model_select.clone();
        let placeholder = self.config.selectors.make_placeholder.clone();

        self.reset_make().await?;

        let mut matched_makes = IndexSet::new();
        for candidate in makes {
            let options = self.option_texts(&make_select).await?;
            matched_makes.extend(
                filter_options(&options, candidate, strategy)
                    .into_iter()
                    .filter(|option| **option != placeholder)
                    .cloned(),
            );
        }
        info!("Makes matching {:?}: {:?}", makes, matched_makes);

        let mut pairs = IndexSet::new();
        for make in &matched_makes {
            self.reset_make().await?;
            self.select_make(make).await?;

            let mut matched_models = IndexSet::new();
            for candidate in models {
                let options = self.option_texts(&model_select).await?;
                matched_models.extend(filter_options(&options, candidate, strategy).into_iter().cloned());
            }

            for model in matched_models {
                pairs.insert(MakeModel::new(make.clone(), model));
            }
        }

        Ok(pairs.into_iter().collect())
    }

    async fn collect_listing_uris(&mut self, filter: &MakeModel) -> Result<Vec<String>> {
        self.reset_advanced_search().await?;
        self.reset_make().await?;
        self.select_make(&filter.make).await?;
        self.select_model(&filter.model).await?;
        self.session
            .click_by_id(&self.config.selectors.search_button, self.config.wait)
            .await?;

        self.select_results_per_page().await?;
        // The result count updates asynchronously after the page size changes
        sleep(self.config.settle_delay).await;

        let source = self.session.source().await?;
        let advertised = extract_result_count(&source, &self.config.selectors)?;

        let result_pages = if is_paginated(advertised, self.config.results_per_page) {
            sleep(self.config.settle_delay).await;
            let source = self.session.source().await?;
            extract_page_links(&source, &self.config.selectors)?
                .iter()
                .map(|href| self.absolute_url(href))
                .collect()
        } else {
            vec![self.session.current_url().await?]
        };
        debug!("{} result pages for {}", result_pages.len(), filter);

        let mut uris = IndexSet::new();
        for page_url in &result_pages {
            self.session.goto(page_url).await?;
            sleep(self.config.settle_delay).await;
            let source = self.session.source().await?;
            uris.extend(extract_listing_links(&source, &self.config.selectors)?);
        }

        check_listing_count(filter, advertised, uris.len())?;

        info!("Found {} listings for make/model: {}", advertised, filter);
        Ok(uris.into_iter().collect())
    }

    async fn scrape_listing(&mut self, asset_uri: &str) -> Result<ListingRecord> {
        let url = self.absolute_url(asset_uri);
        self.session.goto(&url).await?;
        sleep(self.config.settle_delay).await;
        self.session
            .wait_displayed(&self.config.selectors.current_bid, self.config.wait)
            .await?;

        let source = self.session.source().await?;
        extract_listing(&source, &self.config, asset_uri)
    }
}

/// Whether the results span more than one page at the chosen page size.
pub fn is_paginated(advertised: usize, results_per_page: usize) -> bool {
    advertised > results_per_page
}

/// Fails unless every advertised listing was collected exactly once.
pub fn check_listing_count(filter: &MakeModel, advertised: usize, collected: usize) -> Result<()> {
    if collected != advertised {
        return Err(CollectorError::CountMismatch {
            make: filter.make.clone(),
            model: filter.model.clone(),
            advertised,
            collected,
        });
    }
    Ok(())
}

// Page sources are parsed inside these functions so no `Html` is held across an await.

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| CollectorError::Selector(css.to_string()))
}

/// Text of an element with whitespace runs collapsed, as a browser renders it.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_match<'a>(document: &'a Html, css: &str) -> Result<ElementRef<'a>> {
    document
        .select(&selector(css)?)
        .next()
        .ok_or_else(|| CollectorError::ElementNotFound(css.to_string()))
}

/// Distinct `href` values of the elements matching `css`, in page order.
fn distinct_hrefs(html: &str, css: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let links: IndexSet<String> = document
        .select(&selector(css)?)
        .filter_map(|link| link.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:"))
        .map(str::to_string)
        .collect();
    Ok(links.into_iter().collect())
}

/// Advertised number of search results on a results page.
pub fn extract_result_count(html: &str, selectors: &SiteSelectors) -> Result<usize> {
    let document = Html::parse_document(html);
    let header = first_match(&document, &selectors.result_count)?;
    Ok(parse_result_count(&element_text(header))?)
}

/// Links to every page of a multi-page result set.
pub fn extract_page_links(html: &str, selectors: &SiteSelectors) -> Result<Vec<String>> {
    distinct_hrefs(html, &selectors.page_links)
}

/// Listing URIs on one results page. Each listing is linked more than once,
/// so the result is deduplicated.
pub fn extract_listing_links(html: &str, selectors: &SiteSelectors) -> Result<Vec<String>> {
    distinct_hrefs(html, &selectors.listing_links)
}

/// Builds the record of the listing page at `asset_uri`.
pub fn extract_listing(html: &str, config: &SiteConfig, asset_uri: &str) -> Result<ListingRecord> {
    let selectors = &config.selectors;
    let document = Html::parse_document(html);

    let bid_text = element_text(first_match(&document, &format!("#{}", selectors.current_bid))?);
    let current_bid = parse_current_bid(&bid_text)?;

    let closing_text = element_text(first_match(&document, &selectors.closing_time)?);
    let closing_date_utc = parse_closing_time(&closing_text)?;

    let location_link = first_match(&document, &selectors.location_link)?;
    let location = element_text(location_link);
    let map_url = location_link
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|parent| parent.value().attr("href"))
        .ok_or_else(|| CollectorError::ElementNotFound(format!("link around {}", selectors.location_link)))?
        .to_string();

    let mut record = ListingRecord::new(
        &config.base_url,
        asset_uri,
        current_bid,
        closing_date_utc,
        location,
        map_url,
    );

    let label_selector = selector(&selectors.description_label)?;
    let value_selector = selector(&selectors.description_value)?;
    for row in document.select(&selector(&selectors.description_row)?) {
        let Some(key) = row
            .select(&label_selector)
            .next()
            .and_then(|label| normalize_field_key(&element_text(label)))
        else {
            continue;
        };

        let value = row
            .select(&value_selector)
            .next()
            .map(element_text)
            .ok_or_else(|| CollectorError::ElementNotFound(format!("value of description row {key}")))?;

        if !record.insert_description(key.clone(), value) {
            warn!("Description row {} shadows a fixed field on {}; ignored", key, asset_uri);
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, columns};

    const LISTING_PAGE: &str = r#"
        <html><body>
          <div id="currentBid"> $1,234.56 USD </div>
          <app-ux-timer><p>Closes <span>in 2 days <span>(Dec 18, 2024 07:45 AM MST)</span></span></p></app-ux-timer>
          <a href="https://maps.google.com/?q=Mesa+AZ"><span id="lnkAssetDetailLocation">Mesa,
            AZ 85201</span></a>
          <div class="row description-body"><div><h5>Odometer:</h5></div><div><p>98,765 Miles</p></div></div>
          <div class="row description-body"><div><h5>Body Type</h5></div><div><p>Sedan</p></div></div>
          <div class="row description-body"><div><p>Sold as is, where is.</p></div></div>
          <div class="row description-body"><div><h5> : </h5></div><div><p>blank label</p></div></div>
        </body></html>
    "#;

    fn config() -> SiteConfig {
        GovDealsSite::default_config(DEFAULT_BASE_URL)
    }

    #[test]
    fn test_extract_listing() {
        let record = extract_listing(LISTING_PAGE, &config(), "/asset/100/200").unwrap();

        assert_eq!(record.get(columns::SITE_URL), Some(&FieldValue::from(DEFAULT_BASE_URL)));
        assert_eq!(record.asset_uri(), "/asset/100/200");
        assert_eq!(record.get(columns::CURRENT_BID), Some(&FieldValue::Number(1234.56)));
        assert_eq!(
            record.get(columns::CLOSING_DATE_UTC),
            Some(&FieldValue::from("2024-12-18T14:45:00Z"))
        );
        assert_eq!(record.get(columns::LOCATION), Some(&FieldValue::from("Mesa, AZ 85201")));
        assert_eq!(
            record.get(columns::MAP_URL),
            Some(&FieldValue::from("https://maps.google.com/?q=Mesa+AZ"))
        );
        assert_eq!(record.get("ODOMETER"), Some(&FieldValue::from("98,765 Miles")));
        assert_eq!(record.get("BODY_TYPE"), Some(&FieldValue::from("Sedan")));
        // Unlabelled rows are skipped
        assert_eq!(record.keys().count(), 8);
    }

    #[test]
    fn test_extract_listing_requires_fixed_elements() {
        let page = LISTING_PAGE.replace("currentBid", "somethingElse");
        let err = extract_listing(&page, &config(), "/asset/1/2").unwrap_err();
        assert!(matches!(err, CollectorError::ElementNotFound(_)));

        let page = LISTING_PAGE.replace("$1,234.56 USD", "Bidding closed");
        let err = extract_listing(&page, &config(), "/asset/1/2").unwrap_err();
        assert!(matches!(err, CollectorError::Parse(_)));
    }

    #[test]
    fn test_extract_listing_requires_row_values() {
        let page = LISTING_PAGE.replace("<p>Sedan</p>", "");
        let err = extract_listing(&page, &config(), "/asset/1/2").unwrap_err();
        assert!(matches!(err, CollectorError::ElementNotFound(_)));
    }

    #[test]
    fn test_extract_results_page() {
        let page = r##"
            <div id="divResultsSectionHeader"><h5> 3 Results </h5></div>
            <a name="lnkAssetDetails" href="/asset/1/10"><img></a>
            <a name="lnkAssetDetails" href="/asset/1/10">2013 Ford Police Taurus</a>
            <a name="lnkAssetDetails" href="/asset/2/20">2014 Ford Police Taurus</a>
            <a name="lnkAssetDetails" href="/asset/3/30">2015 Ford Police Taurus</a>
            <ul>
              <li class="page-item"><a href="#">Previous</a></li>
              <li class="page-item"><a href="/en/search?page=1">1</a></li>
              <li class="page-item"><a href="/en/search?page=2">2</a></li>
              <li class="page-item"><a href="/en/search?page=2">Next</a></li>
            </ul>
        "##;
        let selectors = config().selectors;

        assert_eq!(extract_result_count(page, &selectors).unwrap(), 3);
        assert_eq!(
            extract_listing_links(page, &selectors).unwrap(),
            vec!["/asset/1/10", "/asset/2/20", "/asset/3/30"]
        );
        assert_eq!(
            extract_page_links(page, &selectors).unwrap(),
            vec!["/en/search?page=1", "/en/search?page=2"]
        );
    }

    #[test]
    fn test_missing_result_header_is_an_error() {
        let err = extract_result_count("<p>nothing</p>", &config().selectors).unwrap_err();
        assert!(matches!(err, CollectorError::ElementNotFound(_)));
    }

    #[test]
    fn test_pagination_starts_above_page_size() {
        assert!(!is_paginated(0, 120));
        assert!(!is_paginated(119, 120));
        assert!(!is_paginated(120, 120));
        assert!(is_paginated(121, 120));
    }

    #[test]
    fn test_listing_count_must_match_advertised() {
        let filter = MakeModel::new("Ford", "Police Taurus");
        assert!(check_listing_count(&filter, 3, 3).is_ok());
        assert!(check_listing_count(&filter, 0, 0).is_ok());

        let err = check_listing_count(&filter, 3, 2).unwrap_err();
        assert!(matches!(err, CollectorError::CountMismatch { advertised: 3, collected: 2, .. }));
        assert!(err.to_string().contains("Ford/Police Taurus"));

        let err = check_listing_count(&filter, 120, 121).unwrap_err();
        assert!(matches!(err, CollectorError::CountMismatch { advertised: 120, collected: 121, .. }));
    }
}
