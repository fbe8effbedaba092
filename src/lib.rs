// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod clean;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::config::MonitorConfig;
pub use crate::monitor::{CycleOutcome, Monitor, MonitorState};

use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::analyze::classifier::build_classifier;
use crate::config::FetchMode;
use crate::fetch::browser::BrowserFetcher;
use crate::fetch::http::HttpFetcher;
use crate::fetch::Fetcher;
use crate::notify::email::EmailSender;
use crate::notify::NotifyPolicy;

/// Build the fetcher selected by `FETCH_MODE`. Launching the browser happens
/// here, so this is the point where a missing Chromium surfaces.
pub fn build_fetcher(cfg: &MonitorConfig) -> anyhow::Result<Box<dyn Fetcher>> {
    let fetcher: Box<dyn Fetcher> = match cfg.fetch_mode {
        FetchMode::Browser => {
            Box::new(BrowserFetcher::launch(&cfg.browser).context("launch browser")?)
        }
        FetchMode::Http => Box::new(
            HttpFetcher::new(&cfg.browser.user_agent, Duration::from_secs(15))
                .context("build http fetcher")?,
        ),
    };
    Ok(fetcher)
}

/// Wire every component from configuration.
pub fn build_monitor(cfg: &MonitorConfig) -> anyhow::Result<Monitor> {
    let classifier = build_classifier(&cfg.classifier).context("build classifier")?;
    let notifier = EmailSender::new(&cfg.email).context("build email sender")?;
    let fetcher = build_fetcher(cfg)?;

    info!(
        fetcher = fetcher.name(),
        classifier = classifier.provider_name(),
        model = %cfg.classifier.model,
        focus = cfg.classifier.focus.as_deref().unwrap_or("-"),
        notify_all = cfg.notify_all,
        "monitor configured"
    );

    Ok(Monitor::new(
        cfg.target_url.clone(),
        cfg.interval,
        fetcher,
        classifier,
        Box::new(notifier),
        NotifyPolicy::new(cfg.notify_all),
    ))
}
