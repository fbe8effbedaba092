// src/fetch/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::FetchError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MediaAttachment {
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// One feed item. `content` is the raw HTML as served by the feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media_attachments: Vec<MediaAttachment>,
}

impl Post {
    /// Preview URL of the first attachment, if it has one.
    pub fn first_preview_url(&self) -> Option<&str> {
        self.media_attachments
            .first()
            .and_then(|m| m.preview_url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

#[async_trait]
pub trait Fetcher: Send {
    /// Load `url` and return whatever JSON document it serves.
    async fn fetch_json(&mut self, url: &str) -> Result<Value, FetchError>;

    fn name(&self) -> &'static str;

    /// Release any external resource (browser process). Safe to call twice.
    fn close(&mut self) {}
}
