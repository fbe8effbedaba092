// src/notify/mod.rs
pub mod email;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::clean::clean_html;
use crate::fetch::Post;

pub const EMAIL_SUBJECT: &str = "New post: market impact analysis";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("build message: {0}")]
    Build(String),

    #[error("transport: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
    fn name(&self) -> &'static str;
}

/// Decides whether a classified post is worth an email.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyPolicy {
    /// Email every new post, even ones classified as irrelevant.
    pub notify_all: bool,
}

impl NotifyPolicy {
    pub fn new(notify_all: bool) -> Self {
        Self { notify_all }
    }

    /// `no_impact` is the formatter's verdict on the raw classifier response.
    pub fn should_notify(&self, no_impact: bool) -> bool {
        self.notify_all || !no_impact
    }
}

/// Plain-text email body for one post.
pub fn compose_email(post: &Post, formatted: &str, now: DateTime<Utc>) -> String {
    let mut body = String::with_capacity(formatted.len() + post.content.len() + 128);
    body.push_str(formatted);
    body.push_str("\n\n----------------------------------------\n");

    let text = clean_html(&post.content);
    if text.is_empty() {
        body.push_str("[Post has no text content]\n");
    } else {
        body.push_str("Post:\n");
        body.push_str(&text);
        body.push('\n');
    }
    if let Some(url) = post.first_preview_url() {
        body.push_str(&format!("Media preview: {url}\n"));
    }
    body.push_str(&format!(
        "\nPost id: {}\nDetected: {}\n",
        post.id,
        now.to_rfc3339()
    ));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MediaAttachment;
    use chrono::TimeZone;

    #[test]
    fn policy_suppresses_only_no_impact() {
        let p = NotifyPolicy::new(false);
        assert!(!p.should_notify(true));
        assert!(p.should_notify(false));

        let all = NotifyPolicy::new(true);
        assert!(all.should_notify(true));
        assert!(all.should_notify(false));
    }

    #[test]
    fn email_body_has_annotation_text_and_media() {
        let post = Post {
            id: "42".into(),
            content: "<p>Tariffs &amp; trade</p>".into(),
            media_attachments: vec![MediaAttachment {
                preview_url: Some("https://media.example/p.jpg".into()),
            }],
        };
        let now = Utc.with_ymd_and_hms(2025, 4, 9, 17, 30, 0).unwrap();
        let body = compose_email(&post, "📉 Autos: BEARISH\n\nCosts rise", now);

        assert!(body.starts_with("📉 Autos: BEARISH\n\nCosts rise\n\n---"));
        assert!(body.contains("Post:\nTariffs & trade\n"));
        assert!(body.contains("Media preview: https://media.example/p.jpg"));
        assert!(body.contains("Post id: 42"));
        assert!(body.contains("2025-04-09T17:30:00+00:00"));
    }
}
