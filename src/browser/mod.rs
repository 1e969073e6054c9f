//! # Browser Session
//!
//! A thin layer over a WebDriver session that gives the site flow the handful
//! of operations it needs: navigation, page source, clicking, reading and
//! choosing `<select>` options, and bounded waits on the displayed DOM.
//!
//! Exactly one session exists per run. It is passed around by reference and
//! consumed by [`BrowserSession::close`] once the run ends, whether or not
//! the run succeeded.
//!
//! Missing elements are treated differently depending on context: while
//! polling they simply mean "not there yet", everywhere else they surface as
//! [`CollectorError::ElementNotFound`].

mod wait;

pub use wait::{WaitPolicy, wait_until};

use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{CollectorError, Result};

pub struct BrowserSession {
    client: Client,
}

impl BrowserSession {
    /// Connects to a running WebDriver server (chromedriver, geckodriver).
    ///
    /// With `headless` set the browser renders without a display, which
    /// replaces running it inside a virtual X server.
    pub async fn connect(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut chrome_args = vec!["--window-size=1920,1080"];
        let mut firefox_args = Vec::new();
        if headless {
            chrome_args.push("--headless=new");
            firefox_args.push("-headless");
        }

        let mut capabilities = serde_json::Map::new();
        capabilities.insert("goog:chromeOptions".to_string(), json!({ "args": chrome_args }));
        capabilities.insert("moz:firefoxOptions".to_string(), json!({ "args": firefox_args }));

        info!("Connecting to webdriver at {}", webdriver_url);
        let mut builder = ClientBuilder::native();
        builder.capabilities(capabilities);
        let client = builder.connect(webdriver_url).await?;

        info!("Webdriver session started");
        Ok(Self { client })
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.client.goto(url).await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.as_str().to_string())
    }

    /// Maximizes the window so the responsive layout shows every control.
    pub async fn maximize(&self) -> Result<()> {
        self.client.maximize_window().await?;
        Ok(())
    }

    /// HTML of the page as currently rendered.
    pub async fn source(&self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Element> {
        absent_as_none(self.client.find(Locator::Id(id)).await)?
            .ok_or_else(|| CollectorError::ElementNotFound(format!("#{id}")))
    }

    async fn is_displayed_by_id(&self, id: &str) -> Result<bool> {
        match absent_as_none(self.client.find(Locator::Id(id)).await)? {
            Some(element) => Ok(absent_as_none(element.is_displayed().await)?.unwrap_or(false)),
            None => Ok(false),
        }
    }

    /// Waits until the element with `id` exists and is displayed.
    pub async fn wait_displayed(&self, id: &str, policy: WaitPolicy) -> Result<()> {
        wait_until(policy, &format!("#{id} to be displayed"), move || {
            self.is_displayed_by_id(id)
        })
        .await
    }

    pub async fn click_by_id(&self, id: &str, policy: WaitPolicy) -> Result<()> {
        self.wait_displayed(id, policy).await?;
        self.find_by_id(id).await?.click().await?;
        Ok(())
    }

    /// Visible texts of the options of the `<select>` with `id`.
    pub async fn option_texts(&self, id: &str, policy: WaitPolicy) -> Result<Vec<String>> {
        self.wait_displayed(id, policy).await?;
        let select = self.find_by_id(id).await?;

        let mut texts = Vec::new();
        for option in select.find_all(Locator::Css("option")).await? {
            texts.push(option.text().await?.trim().to_string());
        }
        Ok(texts)
    }

    /// Number of options of the `<select>` with `id`, or `None` while it is
    /// not in the DOM.
    pub async fn option_count(&self, id: &str) -> Result<Option<usize>> {
        let Some(select) = absent_as_none(self.client.find(Locator::Id(id)).await)? else {
            return Ok(None);
        };
        Ok(absent_as_none(select.find_all(Locator::Css("option")).await)?.map(|options| options.len()))
    }

    /// Chooses the option whose visible text is exactly `text`.
    pub async fn select_by_text(&self, id: &str, text: &str, policy: WaitPolicy) -> Result<()> {
        self.wait_displayed(id, policy).await?;
        let select = self.find_by_id(id).await?;

        absent_as_none(select.select_by_label(text).await)?
            .ok_or_else(|| CollectorError::ElementNotFound(format!("#{id} option '{text}'")))
    }

    /// Ends the WebDriver session.
    pub async fn close(self) -> Result<()> {
        info!("Closing webdriver session");
        self.client.close().await?;
        Ok(())
    }
}

fn absent_as_none<T>(result: std::result::Result<T, CmdError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_no_such_element() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
