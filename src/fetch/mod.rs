// src/fetch/mod.rs
//! Feed fetching: a `Fetcher` loads the target URL, `extract_json_text` digs the
//! JSON out of whatever the browser rendered, `parse_newest` turns it into a post.

pub mod browser;
pub mod http;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::clean::strip_tags;
pub use crate::fetch::types::{Fetcher, MediaAttachment, Post};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("browser error: {0}")]
    Browser(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("non-success status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of posts, got {0}")]
    NotAList(&'static str),

    #[error("malformed post record: {0}")]
    MalformedPost(String),
}

fn re_pre() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<pre[^>]*>(.*)</pre>").expect("pre regex"))
}

fn re_body() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<body[^>]*>(.*)</body>").expect("body regex"))
}

/// Pull the JSON text out of a rendered page.
///
/// Chromium shows raw JSON responses inside a `<pre>`; some anti-bot
/// interstitials wrap it in a bare `<body>` instead. Anything else is
/// returned as-is so plain HTTP bodies pass straight through.
pub fn extract_json_text(page: &str) -> String {
    let inner = if let Some(c) = re_pre().captures(page) {
        c[1].to_string()
    } else if let Some(c) = re_body().captures(page) {
        strip_tags(&c[1])
    } else {
        return page.trim().to_string();
    };
    html_escape::decode_html_entities(inner.trim()).into_owned()
}

/// Parse a fetched page into a JSON value.
///
/// A page that already is JSON is taken as-is; post content may itself
/// contain `<pre>` or `<body>` markup.
pub fn parse_page(page: &str) -> Result<Value, FetchError> {
    if let Ok(value) = serde_json::from_str(page.trim()) {
        return Ok(value);
    }
    let text = extract_json_text(page);
    Ok(serde_json::from_str(&text)?)
}

/// Newest post of a newest-first feed.
///
/// Only a JSON array is accepted. The first record needs an `id` (string or
/// number); `content` and `media_attachments` may be missing. Older records
/// are not inspected, so a malformed entry further down does not block
/// detection.
pub fn parse_newest(value: Value) -> Result<Option<Post>, FetchError> {
    match value {
        Value::Array(items) => items.into_iter().next().map(parse_post).transpose(),
        other => Err(FetchError::NotAList(json_kind(&other))),
    }
}

fn parse_post(item: Value) -> Result<Post, FetchError> {
    let mut obj = match item {
        Value::Object(obj) => obj,
        other => {
            return Err(FetchError::MalformedPost(format!(
                "record is {}",
                json_kind(&other)
            )))
        }
    };

    let id = match obj.remove("id") {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(FetchError::MalformedPost(format!(
                "id is {}",
                json_kind(&other)
            )))
        }
        None => return Err(FetchError::MalformedPost("missing id".into())),
    };
    let content = match obj.remove("content") {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };
    let media_attachments = match obj.remove("media_attachments") {
        Some(v @ Value::Array(_)) => serde_json::from_value(v).unwrap_or_default(),
        _ => Vec::new(),
    };

    Ok(Post {
        id,
        content,
        media_attachments,
    })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
