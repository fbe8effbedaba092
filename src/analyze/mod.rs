// src/analyze/mod.rs
//! Market-impact analysis: prompt template, LLM classifier and the renderer for
//! its bracket annotations.

pub mod annotation;
pub mod classifier;
pub mod prompt;

pub use crate::analyze::annotation::{AnnotationFormatter, BracketFormatter, ImpactLabel};
pub use crate::analyze::classifier::{
    build_classifier, Classifier, ClassifierConfig, ClassifyError, DynClassifier, MockClassifier,
};
