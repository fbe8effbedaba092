// src/monitor.rs
//! Poll loop: fetch the feed, detect a new newest post, classify it, maybe
//! email it, sleep, repeat.
//!
//! States: `Uninitialized -> Seeded -> Monitoring` (self-looping). The first
//! fetch only seeds the cursor so startup never produces an alert.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use tracing::{debug, info, warn};

use crate::analyze::annotation::{AnnotationFormatter, BracketFormatter};
use crate::analyze::classifier::DynClassifier;
use crate::clean::clean_html;
use crate::fetch::{parse_newest, FetchError, Fetcher, Post};
use crate::metrics as m;
use crate::notify::{compose_email, Notifier, NotifyPolicy, EMAIL_SUBJECT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Uninitialized,
    Seeded,
    Monitoring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// First identifier ever seen; stored silently.
    Seeded,
    Unchanged,
    New { previous: String },
}

/// Remembers the id of the last announced post.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    cursor: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(id: impl Into<String>) -> Self {
        Self {
            cursor: Some(id.into()),
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Compare the newest id with the cursor and advance the cursor.
    /// The cursor moves before any downstream work, so a post is handled once
    /// even if classification or delivery fails.
    pub fn observe(&mut self, newest_id: &str) -> Change {
        match self.cursor.as_deref() {
            None => {
                self.cursor = Some(newest_id.to_string());
                Change::Seeded
            }
            Some(prev) if prev == newest_id => Change::Unchanged,
            Some(prev) => {
                let previous = prev.to_string();
                self.cursor = Some(newest_id.to_string());
                Change::New { previous }
            }
        }
    }
}

/// What one cycle did. Returned for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    FetchFailed,
    Empty,
    Seeded { id: String },
    Unchanged,
    NoText { id: String },
    ClassifyFailed { id: String },
    Suppressed { id: String },
    Notified { id: String },
    NotifyFailed { id: String },
}

pub struct Monitor {
    target_url: String,
    interval: Duration,
    fetcher: Box<dyn Fetcher>,
    classifier: DynClassifier,
    formatter: Box<dyn AnnotationFormatter>,
    notifier: Box<dyn Notifier>,
    policy: NotifyPolicy,
    detector: ChangeDetector,
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        target_url: impl Into<String>,
        interval: Duration,
        fetcher: Box<dyn Fetcher>,
        classifier: DynClassifier,
        notifier: Box<dyn Notifier>,
        policy: NotifyPolicy,
    ) -> Self {
        m::ensure_described();
        Self {
            target_url: target_url.into(),
            interval,
            fetcher,
            classifier,
            formatter: Box::new(BracketFormatter),
            notifier,
            policy,
            detector: ChangeDetector::new(),
            state: MonitorState::Uninitialized,
        }
    }

    pub fn with_formatter(mut self, formatter: Box<dyn AnnotationFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Start from a known cursor and skip seeding.
    pub fn with_cursor(mut self, id: impl Into<String>) -> Self {
        self.detector = ChangeDetector::with_cursor(id);
        self.state = MonitorState::Seeded;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn cursor(&self) -> Option<&str> {
        self.detector.cursor()
    }

    async fn fetch_newest(&mut self) -> Result<Option<Post>, FetchError> {
        let value = self.fetcher.fetch_json(&self.target_url).await?;
        parse_newest(value)
    }

    /// Initial fetch. Moves to `Seeded` whatever happens; a failed fetch leaves
    /// the cursor unset and the next successful poll seeds it instead.
    pub async fn seed(&mut self) -> CycleOutcome {
        info!(url = %self.target_url, fetcher = self.fetcher.name(), "initial fetch");
        let outcome = match self.fetch_newest().await {
            Ok(Some(post)) => {
                self.detector.observe(&post.id);
                info!(id = %post.id, "cursor seeded");
                CycleOutcome::Seeded { id: post.id }
            }
            Ok(None) => {
                warn!("initial fetch returned no posts");
                CycleOutcome::Empty
            }
            Err(e) => {
                warn!(error = %e, "initial fetch failed; will seed on the next successful poll");
                counter!(m::FETCH_ERRORS).increment(1);
                CycleOutcome::FetchFailed
            }
        };
        self.state = MonitorState::Seeded;
        outcome
    }

    /// One poll cycle, without the sleep.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        counter!(m::POLLS).increment(1);
        gauge!(m::LAST_POLL_TS).set(Utc::now().timestamp() as f64);
        if self.state == MonitorState::Seeded {
            self.state = MonitorState::Monitoring;
        }

        let newest = match self.fetch_newest().await {
            Ok(Some(post)) => post,
            Ok(None) => {
                debug!("feed returned no posts");
                return CycleOutcome::Empty;
            }
            Err(e) => {
                warn!(error = %e, "fetch failed; skipping cycle");
                counter!(m::FETCH_ERRORS).increment(1);
                return CycleOutcome::FetchFailed;
            }
        };

        match self.detector.observe(&newest.id) {
            Change::Seeded => {
                info!(id = %newest.id, "cursor seeded");
                CycleOutcome::Seeded { id: newest.id }
            }
            Change::Unchanged => CycleOutcome::Unchanged,
            Change::New { previous } => {
                info!(id = %newest.id, %previous, "new post detected");
                counter!(m::POSTS_DETECTED).increment(1);
                self.process(newest).await
            }
        }
    }

    async fn process(&self, post: Post) -> CycleOutcome {
        let id = post.id.clone();
        let text = clean_html(&post.content);
        if text.is_empty() {
            info!(
                %id,
                has_media = !post.media_attachments.is_empty(),
                "post has no text content; skipping analysis"
            );
            return CycleOutcome::NoText { id };
        }
        debug!(%id, chars = text.chars().count(), "classifying");

        let raw = match self.classifier.classify(&text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%id, provider = self.classifier.provider_name(), error = %e, "classification failed");
                counter!(m::CLASSIFY_ERRORS).increment(1);
                return CycleOutcome::ClassifyFailed { id };
            }
        };

        let no_impact = self.formatter.is_no_impact(&raw);
        if !self.policy.should_notify(no_impact) {
            info!(%id, "no market impact; notification suppressed");
            counter!(m::NOTIFICATIONS_SUPPRESSED).increment(1);
            return CycleOutcome::Suppressed { id };
        }

        let formatted = self.formatter.render(&raw);
        let body = compose_email(&post, &formatted, Utc::now());
        match self.notifier.send(EMAIL_SUBJECT, &body).await {
            Ok(()) => {
                info!(%id, notifier = self.notifier.name(), "notification sent");
                counter!(m::NOTIFICATIONS_SENT).increment(1);
                CycleOutcome::Notified { id }
            }
            Err(e) => {
                warn!(%id, notifier = self.notifier.name(), error = %e, "notification failed");
                counter!(m::NOTIFY_ERRORS).increment(1);
                CycleOutcome::NotifyFailed { id }
            }
        }
    }

    /// Seed (if needed) and poll every `interval` until `shutdown` resolves.
    /// Does not release the fetcher; call [`Monitor::shutdown`] afterwards.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if self.state == MonitorState::Uninitialized {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("stop requested during initial fetch");
                    return;
                }
                _ = self.seed() => {}
            }
        }

        info!(interval_secs = self.interval.as_secs(), "monitoring for new posts");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                outcome = self.poll_once() => debug!(?outcome, "cycle finished"),
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("monitor stopped by user");
    }

    /// Release the fetcher's resources (closes the browser).
    pub fn shutdown(&mut self) {
        info!(fetcher = self.fetcher.name(), "releasing fetcher");
        self.fetcher.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_seeds() {
        let mut d = ChangeDetector::new();
        assert_eq!(d.observe("10"), Change::Seeded);
        assert_eq!(d.cursor(), Some("10"));
    }

    #[test]
    fn same_id_is_unchanged() {
        let mut d = ChangeDetector::with_cursor("10");
        assert_eq!(d.observe("10"), Change::Unchanged);
        assert_eq!(d.cursor(), Some("10"));
    }

    #[test]
    fn different_id_advances() {
        let mut d = ChangeDetector::with_cursor("10");
        assert_eq!(
            d.observe("11"),
            Change::New {
                previous: "10".into()
            }
        );
        assert_eq!(d.cursor(), Some("11"));
        assert_eq!(d.observe("11"), Change::Unchanged);
    }

    #[test]
    fn deleted_newest_post_counts_as_new() {
        // Only equality matters: an older id reappearing at the top is a change.
        let mut d = ChangeDetector::with_cursor("11");
        assert!(matches!(d.observe("10"), Change::New { .. }));
    }
}
