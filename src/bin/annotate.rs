//! Classify text from stdin with the configured classifier and print the
//! rendered annotation. Handy for tuning the prompt or the focus clause.
//!
//! ```text
//! echo "Tariffs on steel go to 50%" | cargo run --bin annotate
//! AI_TEST_MODE=mock cargo run --bin annotate < post.html
//! ```

use std::io::Read;

use anyhow::Context;
use post_impact_monitor::analyze::classifier::{is_mock_mode, TEST_MODE_VAR};
use post_impact_monitor::analyze::{
    build_classifier, AnnotationFormatter, BracketFormatter, ClassifierConfig,
};
use post_impact_monitor::clean::clean_html;
use post_impact_monitor::config::{load_file_default, LogFormat, ProcessEnv, Vars};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    post_impact_monitor::logging::init(LogFormat::Compact);

    // Only the classifier settings matter here; mail credentials are not needed.
    let file = load_file_default()?;
    let env = ProcessEnv;
    let defaults = ClassifierConfig::default();
    let cfg = ClassifierConfig {
        api_key: env.get("OPENAI_API_KEY").unwrap_or_default(),
        model: env
            .get("OPENAI_MODEL")
            .or(file.openai_model)
            .unwrap_or(defaults.model),
        base_url: env
            .get("OPENAI_BASE_URL")
            .or(file.openai_base_url)
            .unwrap_or(defaults.base_url),
        focus: env.get("MARKET_FOCUS").or(file.market_focus),
        mock: is_mock_mode(env.get(TEST_MODE_VAR).as_deref()),
    };

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("read stdin")?;
    let text = clean_html(&input);
    anyhow::ensure!(!text.is_empty(), "no text on stdin");

    let classifier = build_classifier(&cfg)?;
    let raw = classifier.classify(&text).await?;

    let formatter = BracketFormatter;
    println!("--- raw ({}) ---\n{raw}", classifier.provider_name());
    println!("--- rendered ---\n{}", formatter.render(&raw));
    if formatter.is_no_impact(&raw) {
        println!("--- (would be suppressed unless NOTIFY_ALL_POSTS is set) ---");
    }
    Ok(())
}
