// src/analyze/annotation.rs
//! Rendering of the classifier's bracket annotation, e.g.
//! `[Apple][AAPL][BULLISH][Tariff exemption for phones]`.
//!
//! The model output is a loose contract, so parsing is best-effort and never
//! fails: unrecognised pieces are shown as bullet lines and input without any
//! brackets is passed through untouched.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Leading token meaning "this post has no market relevance".
pub const NO_IMPACT_MARKER: &str = "NONE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImpactLabel {
    Bullish,
    Bearish,
    Neutral,
    Volatile,
}

impl ImpactLabel {
    pub const ALL: [ImpactLabel; 4] = [
        ImpactLabel::Bullish,
        ImpactLabel::Bearish,
        ImpactLabel::Neutral,
        ImpactLabel::Volatile,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        let t = token.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(t))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImpactLabel::Bullish => "BULLISH",
            ImpactLabel::Bearish => "BEARISH",
            ImpactLabel::Neutral => "NEUTRAL",
            ImpactLabel::Volatile => "VOLATILE",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            ImpactLabel::Bullish => "📈",
            ImpactLabel::Bearish => "📉",
            ImpactLabel::Neutral => "➖",
            ImpactLabel::Volatile => "⚡",
        }
    }
}

/// Keeps the loop independent of the model's output format.
pub trait AnnotationFormatter: Send + Sync {
    /// Human-readable rendering of a raw model response.
    fn render(&self, raw: &str) -> String;

    /// True when the response says the post is irrelevant to markets.
    fn is_no_impact(&self, raw: &str) -> bool;
}

/// One parsed line of the entity analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityLine {
    WithTicker {
        entity: String,
        ticker: String,
        label: ImpactLabel,
    },
    Plain {
        entity: String,
        label: ImpactLabel,
    },
    Unparsed(String),
}

impl EntityLine {
    fn render(&self) -> String {
        match self {
            EntityLine::WithTicker {
                entity,
                ticker,
                label,
            } => format!("{} {entity} ({ticker}): {}", label.glyph(), label.as_str()),
            EntityLine::Plain { entity, label } => {
                format!("{} {entity}: {}", label.glyph(), label.as_str())
            }
            EntityLine::Unparsed(raw) => format!("• {raw}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// No bracket tokens at all; shown as-is.
    Raw(String),
    NoImpact {
        justification: Option<String>,
    },
    Entities {
        lines: Vec<EntityLine>,
        justification: Option<String>,
    },
}

fn re_token() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\[([^\[\]]*)\]").expect("token regex"))
}

pub fn tokens(raw: &str) -> Vec<String> {
    re_token()
        .captures_iter(raw)
        .map(|c| c[1].trim().to_string())
        .collect()
}

pub fn parse(raw: &str) -> Annotation {
    let mut toks = tokens(raw);
    if toks.is_empty() {
        return Annotation::Raw(raw.to_string());
    }

    // A lone token is analysis without a justification.
    let justification = if toks.len() > 1 { toks.pop() } else { None };
    let analysis = toks;

    if analysis[0].eq_ignore_ascii_case(NO_IMPACT_MARKER) {
        return Annotation::NoImpact { justification };
    }

    let mut lines = Vec::new();
    let mut i = 0;
    while i < analysis.len() {
        let third = analysis.get(i + 2).and_then(|t| ImpactLabel::from_token(t));
        let second = analysis.get(i + 1).and_then(|t| ImpactLabel::from_token(t));
        if let Some(label) = third {
            lines.push(EntityLine::WithTicker {
                entity: analysis[i].clone(),
                ticker: analysis[i + 1].clone(),
                label,
            });
            i += 3;
        } else if let Some(label) = second {
            lines.push(EntityLine::Plain {
                entity: analysis[i].clone(),
                label,
            });
            i += 2;
        } else {
            lines.push(EntityLine::Unparsed(analysis[i].clone()));
            i += 1;
        }
    }

    Annotation::Entities {
        lines,
        justification,
    }
}

pub fn render(annotation: &Annotation) -> String {
    let (body, justification) = match annotation {
        Annotation::Raw(raw) => return raw.clone(),
        Annotation::NoImpact { justification } => (NO_IMPACT_MARKER.to_string(), justification),
        Annotation::Entities {
            lines,
            justification,
        } => (
            lines
                .iter()
                .map(EntityLine::render)
                .collect::<Vec<_>>()
                .join("\n"),
            justification,
        ),
    };

    match justification {
        Some(j) => format!("{body}\n\n{j}"),
        None => body,
    }
}

/// Starts with `[NONE]`, ignoring case and inner padding.
pub fn starts_with_no_impact(raw: &str) -> bool {
    raw.trim_start()
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .is_some_and(|(first, _)| first.trim().eq_ignore_ascii_case(NO_IMPACT_MARKER))
}

/// Default formatter for the `[entity][ticker][LABEL]...[justification]` layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketFormatter;

impl AnnotationFormatter for BracketFormatter {
    fn render(&self, raw: &str) -> String {
        render(&parse(raw))
    }

    fn is_no_impact(&self, raw: &str) -> bool {
        starts_with_no_impact(raw)
    }
}
