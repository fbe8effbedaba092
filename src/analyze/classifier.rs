//! Classifier: provider abstraction over a hosted LLM that annotates post text
//! with expected market impact.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::prompt::build_prompt;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier not configured: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("model returned an empty answer")]
    Empty,
}

pub type ClassifyFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ClassifyError>> + Send + 'a>>;

/// Trait object used by the monitor loop and the `annotate` bin.
pub trait Classifier: Send + Sync {
    /// Return the raw model annotation for `text`.
    fn classify<'a>(&'a self, text: &'a str) -> ClassifyFuture<'a>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn Classifier>;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub focus: Option<String>,
    /// Use the fixed mock instead of calling the API.
    pub mock: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            focus: None,
            mock: false,
        }
    }
}

/// Setting that selects the mock classifier when it equals `mock`.
pub const TEST_MODE_VAR: &str = "AI_TEST_MODE";

/// Factory.
///
/// * `config.mock` (`AI_TEST_MODE=mock`) returns a deterministic mock that
///   always says `[NONE]`.
/// * Otherwise builds the OpenAI provider.
pub fn build_classifier(config: &ClassifierConfig) -> Result<DynClassifier, ClassifyError> {
    if config.mock {
        return Ok(Arc::new(MockClassifier::new(
            "[NONE][Mock classifier: no analysis performed]",
        )));
    }
    Ok(Arc::new(OpenAiClassifier::new(config)?))
}

/// Interpret the value of `AI_TEST_MODE`.
pub fn is_mock_mode(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("mock"))
}

// ------------------------------------------------------------
// OpenAI provider
// ------------------------------------------------------------

/// Chat Completions provider.
pub struct OpenAiClassifier {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    focus: Option<String>,
}

impl OpenAiClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        if config.api_key.trim().is_empty() {
            return Err(ClassifyError::Config("OPENAI_API_KEY is empty".into()));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("post-impact-monitor/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClassifyError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            focus: config.focus.clone(),
        })
    }

    async fn classify_impl(&self, text: &str) -> Result<String, ClassifyError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let prompt = build_prompt(text, self.focus.as_deref());
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.2,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ClassifyError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClassifyError::Api {
                status: status.as_u16(),
                body: truncate(&body, 300),
            });
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ClassifyError::Parse(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ClassifyError::Empty);
        }
        Ok(trimmed.to_string())
    }
}

impl Classifier for OpenAiClassifier {
    fn classify<'a>(&'a self, text: &'a str) -> ClassifyFuture<'a> {
        Box::pin(self.classify_impl(text))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Mock
// ------------------------------------------------------------

/// Fixed answer; used with `AI_TEST_MODE=mock` and in tests.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    pub fixed: String,
}

impl MockClassifier {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

impl Classifier for MockClassifier {
    fn classify<'a>(&'a self, _text: &'a str) -> ClassifyFuture<'a> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}
