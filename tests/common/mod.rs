// tests/common/mod.rs
// In-memory fakes for the three external seams.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use post_impact_monitor::analyze::classifier::{Classifier, ClassifyError, ClassifyFuture};
use post_impact_monitor::analyze::AnnotationFormatter;
use post_impact_monitor::fetch::{FetchError, Fetcher};
use post_impact_monitor::notify::{Notifier, NotifyError, NotifyPolicy};
use post_impact_monitor::Monitor;
use serde_json::Value;

/// Replays scripted responses; once the script runs out, repeats `fallback`.
pub struct ScriptedFetcher {
    script: VecDeque<Result<Value, FetchError>>,
    fallback: Value,
    pub calls: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<Value, FetchError>>) -> Self {
        Self {
            script: script.into(),
            fallback: Value::Array(vec![]),
            calls: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn repeating(value: Value) -> Self {
        let mut f = Self::new(vec![]);
        f.fallback = value;
        f
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_json(&mut self, _url: &str) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Records every text it is asked about and answers with `answer`
/// (or fails when `answer` is `None`).
pub struct RecordingClassifier {
    answer: Option<String>,
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingClassifier {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Classifier for RecordingClassifier {
    fn classify<'a>(&'a self, text: &'a str) -> ClassifyFuture<'a> {
        self.seen.lock().unwrap().push(text.to_string());
        let out = match &self.answer {
            Some(a) => Ok(a.clone()),
            None => Err(ClassifyError::Api {
                status: 503,
                body: "overloaded".into(),
            }),
        };
        Box::pin(async move { out })
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        if self.fail {
            return Err(NotifyError::Transport("535 authentication failed".into()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub struct Harness {
    pub monitor: Monitor,
    pub seen: Arc<Mutex<Vec<String>>>,
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub fetch_calls: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
}

impl Harness {
    pub fn with_cursor(mut self, id: &str) -> Self {
        self.monitor = self.monitor.with_cursor(id);
        self
    }

    pub fn with_formatter(mut self, formatter: impl AnnotationFormatter + 'static) -> Self {
        self.monitor = self.monitor.with_formatter(Box::new(formatter));
        self
    }
}

pub fn harness(
    fetcher: ScriptedFetcher,
    classifier: RecordingClassifier,
    notifier: RecordingNotifier,
    notify_all: bool,
) -> Harness {
    let seen = classifier.seen.clone();
    let sent = notifier.sent.clone();
    let fetch_calls = fetcher.calls.clone();
    let closed = fetcher.closed.clone();
    let monitor = Monitor::new(
        "https://feed.test/api/v1/statuses",
        Duration::from_millis(10),
        Box::new(fetcher),
        Arc::new(classifier),
        Box::new(notifier),
        NotifyPolicy::new(notify_all),
    );
    Harness {
        monitor,
        seen,
        sent,
        fetch_calls,
        closed,
    }
}

pub fn post(id: &str, content: &str) -> Value {
    serde_json::json!({ "id": id, "content": content, "media_attachments": [] })
}
