// src/fetch/browser.rs
//! Chromium-driven fetcher. The feed sits behind an anti-bot wall that rejects
//! plain HTTP clients, so we let a real browser navigate to the API URL and
//! read the JSON it renders.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{parse_page, FetchError, Fetcher, DEFAULT_USER_AGENT};

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    /// How long the browser may sit idle between polls before the DevTools
    /// connection is dropped. Must exceed the poll interval.
    pub idle_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1280,
            window_height: 900,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

pub struct BrowserFetcher {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

// `responseStatus` is exposed by Chromium 109+; older builds yield null and
// we skip the status check.
const NAV_STATUS_JS: &str =
    "(performance.getEntriesByType('navigation')[0] || {}).responseStatus || null";

impl BrowserFetcher {
    pub fn launch(config: &BrowserConfig) -> Result<Self, FetchError> {
        info!(
            headless = config.headless,
            width = config.window_width,
            height = config.window_height,
            "launching browser"
        );

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(config.idle_timeout)
            .build()
            .map_err(|e| FetchError::Browser(format!("launch options: {e}")))?;

        let browser =
            Browser::new(options).map_err(|e| FetchError::Browser(format!("launch: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| FetchError::Browser(format!("new tab: {e}")))?;
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| FetchError::Browser(format!("set user agent: {e}")))?;
        tab.set_default_timeout(config.navigation_timeout);

        info!("browser ready");
        Ok(Self {
            browser: Some(browser),
            tab: Some(tab),
        })
    }

    fn load_page(tab: &Tab, url: &str) -> Result<String, FetchError> {
        tab.navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| FetchError::Browser(format!("navigate to {url}: {e}")))?;

        match tab.evaluate(NAV_STATUS_JS, false) {
            Ok(obj) => {
                if let Some(status) = obj.value.as_ref().and_then(Value::as_u64) {
                    if !(200..300).contains(&status) {
                        return Err(FetchError::Status {
                            status: status as u16,
                            url: url.to_string(),
                        });
                    }
                }
            }
            Err(e) => debug!("navigation status unavailable: {e}"),
        }

        tab.get_content()
            .map_err(|e| FetchError::Browser(format!("read page content: {e}")))
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn fetch_json(&mut self, url: &str) -> Result<Value, FetchError> {
        let tab = self
            .tab
            .clone()
            .ok_or_else(|| FetchError::Browser("browser already closed".into()))?;
        let target = url.to_string();

        // headless_chrome is synchronous; keep it off the async worker.
        let page = tokio::task::spawn_blocking(move || Self::load_page(&tab, &target))
            .await
            .map_err(|e| FetchError::Browser(format!("browser task: {e}")))??;

        debug!(bytes = page.len(), "page loaded");
        parse_page(&page)
    }

    fn name(&self) -> &'static str {
        "browser"
    }

    fn close(&mut self) {
        self.tab.take();
        if self.browser.take().is_some() {
            info!("browser closed");
        }
    }
}

impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        if self.browser.is_some() {
            warn!("browser fetcher dropped without close(); shutting browser down");
            self.close();
        }
    }
}
