//! Run configuration
//!
//! The defaults below describe the run; each can be overridden through the
//! environment (or a `.env` file loaded at startup). There are no
//! command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::{CollectorError, Result};
use crate::matching::MatchStrategy;
use crate::scrapers::govdeals::DEFAULT_BASE_URL;

/// Candidate make substrings
pub const MAKES: &[&str] = &[
    "ford", // Ford | FORD
];

/// Candidate model substrings
pub const MODELS: &[&str] = &[
    "taurus", // Taurus | Interceptor Taurus | Police Taurus
    "fpis",   // Ford Police Interceptor Sedan
    "sedan",  // Police/Interceptor Sedan
];

pub const DATA_FILE: &str = "data.csv";
pub const WEBDRIVER_URL: &str = "http://localhost:4444";
pub const RESULTS_PER_PAGE: usize = 120;
pub const WAIT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub site_url: String,
    pub makes: Vec<String>,
    pub models: Vec<String>,
    pub match_strategy: MatchStrategy,
    pub data_file: PathBuf,
    pub webdriver_url: String,
    pub headless: bool,
    pub results_per_page: usize,
    pub wait_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_BASE_URL.to_string(),
            makes: MAKES.iter().map(ToString::to_string).collect(),
            models: MODELS.iter().map(ToString::to_string).collect(),
            match_strategy: MatchStrategy::default(),
            data_file: PathBuf::from(DATA_FILE),
            webdriver_url: WEBDRIVER_URL.to_string(),
            headless: true,
            results_per_page: RESULTS_PER_PAGE,
            wait_timeout: Duration::from_secs(WAIT_TIMEOUT_SECS),
        }
    }
}

impl CollectorConfig {
    /// Defaults overridden by environment variables.
    ///
    /// ## Environment Variables
    ///
    /// - `AUCTION_SITE_URL`: base URL of the auction site
    /// - `AUCTION_MAKES`, `AUCTION_MODELS`: comma separated candidates
    /// - `AUCTION_MATCH_STRATEGY`: `contains`, `prefix` or `exact`
    /// - `AUCTION_DATA_FILE`: CSV file holding collected listings
    /// - `AUCTION_RESULTS_PER_PAGE`: page size chosen on the results page
    /// - `AUCTION_WAIT_TIMEOUT_SECS`: bound for element waits
    /// - `WEBDRIVER_URL`: address of the WebDriver server
    /// - `BROWSER_HEADLESS`: `false` to show the browser window
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("AUCTION_SITE_URL") {
            config.site_url = url.trim_end_matches('/').to_string();
        }
        if let Some(makes) = get("AUCTION_MAKES") {
            config.makes = split_list("AUCTION_MAKES", &makes)?;
        }
        if let Some(models) = get("AUCTION_MODELS") {
            config.models = split_list("AUCTION_MODELS", &models)?;
        }
        if let Some(strategy) = get("AUCTION_MATCH_STRATEGY") {
            config.match_strategy = strategy.parse().map_err(|reason| CollectorError::Config {
                key: "AUCTION_MATCH_STRATEGY",
                reason,
            })?;
        }
        if let Some(path) = get("AUCTION_DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }
        if let Some(n) = get("AUCTION_RESULTS_PER_PAGE") {
            config.results_per_page = parse_number("AUCTION_RESULTS_PER_PAGE", &n)?;
        }
        if let Some(secs) = get("AUCTION_WAIT_TIMEOUT_SECS") {
            config.wait_timeout = Duration::from_secs(parse_number("AUCTION_WAIT_TIMEOUT_SECS", &secs)?);
        }
        if let Some(url) = get("WEBDRIVER_URL") {
            config.webdriver_url = url;
        }
        if let Some(flag) = get("BROWSER_HEADLESS") {
            config.headless = match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    warn!("Ignoring BROWSER_HEADLESS={}, keeping headless mode", other);
                    true
                }
            };
        }

        Ok(config)
    }
}

fn split_list(key: &'static str, value: &str) -> Result<Vec<String>> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return Err(CollectorError::Config {
            key,
            reason: "expected at least one value".to_string(),
        });
    }
    Ok(items)
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T> {
    match value.parse::<T>() {
        Ok(n) => Ok(n),
        Err(_) => Err(CollectorError::Config {
            key,
            reason: format!("`{value}` is not a valid number"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = CollectorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CollectorConfig::default());
        assert_eq!(config.makes, vec!["ford"]);
        assert_eq!(config.models, vec!["taurus", "fpis", "sedan"]);
        assert_eq!(config.wait_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_environment_overrides() {
        let config = CollectorConfig::from_lookup(lookup(&[
            ("AUCTION_SITE_URL", "https://auctions.example/"),
            ("AUCTION_MAKES", "chevrolet, dodge ,"),
            ("AUCTION_MATCH_STRATEGY", "exact"),
            ("AUCTION_RESULTS_PER_PAGE", "24"),
            ("AUCTION_DATA_FILE", "/tmp/out.csv"),
            ("BROWSER_HEADLESS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.site_url, "https://auctions.example");
        assert_eq!(config.makes, vec!["chevrolet", "dodge"]);
        assert_eq!(config.models, vec!["taurus", "fpis", "sedan"]);
        assert_eq!(config.match_strategy, MatchStrategy::Equals);
        assert_eq!(config.results_per_page, 24);
        assert_eq!(config.data_file, PathBuf::from("/tmp/out.csv"));
        assert!(!config.headless);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = CollectorConfig::from_lookup(lookup(&[("AUCTION_RESULTS_PER_PAGE", "many")])).unwrap_err();
        assert!(matches!(err, CollectorError::Config { key: "AUCTION_RESULTS_PER_PAGE", .. }));

        let err = CollectorConfig::from_lookup(lookup(&[("AUCTION_MODELS", " , ")])).unwrap_err();
        assert!(matches!(err, CollectorError::Config { key: "AUCTION_MODELS", .. }));

        let err = CollectorConfig::from_lookup(lookup(&[("AUCTION_MATCH_STRATEGY", "fuzzy")])).unwrap_err();
        assert!(matches!(err, CollectorError::Config { key: "AUCTION_MATCH_STRATEGY", .. }));
    }
}
