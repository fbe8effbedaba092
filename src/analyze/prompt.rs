// src/analyze/prompt.rs
//! Instruction template sent with every post.

use super::annotation::{ImpactLabel, NO_IMPACT_MARKER};

const INSTRUCTIONS: &str = "\
You are a financial markets analyst. Read the social media post below and judge \
whether it could move the price of specific companies, sectors, commodities or \
indices in the short term.

Answer ONLY with bracketed tokens, no other text:
- For every affected asset emit [Entity][Ticker or sector][LABEL]. If there is no \
sensible ticker, emit [Entity][LABEL].
- LABEL is one of: {labels}.
- Finish with one [justification] of at most two sentences.
- If the post has no plausible market impact, answer [{none}][short reason].";

const EXAMPLES: &str = "\
Examples:
Post: \"Effective immediately, tariffs on all imported steel go to 50%!\"
Answer: [US steelmakers][XLB][BULLISH][Automakers][F][BEARISH][Higher import tariffs protect domestic steel and raise input costs for car makers]

Post: \"Happy Thanksgiving to all!\"
Answer: [{none}][Holiday greeting without policy content]";

/// Build the full prompt for one post. `focus` narrows the analysis to a topic
/// (e.g. "semiconductors") when set.
pub fn build_prompt(text: &str, focus: Option<&str>) -> String {
    let labels = ImpactLabel::ALL
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = INSTRUCTIONS
        .replace("{labels}", &labels)
        .replace("{none}", NO_IMPACT_MARKER);
    out.push_str("\n\n");
    out.push_str(&EXAMPLES.replace("{none}", NO_IMPACT_MARKER));

    if let Some(f) = focus.map(str::trim).filter(|f| !f.is_empty()) {
        out.push_str(&format!(
            "\n\nFocus especially on effects related to: {f}. Mention other assets only if the impact is strong."
        ));
    }

    out.push_str("\n\nPost:\n\"\"\"\n");
    out.push_str(text);
    out.push_str("\n\"\"\"\nAnswer:");
    out
}
