// src/clean.rs
//! HTML-to-text cleaning shared by the fetcher (JSON extraction) and the
//! notifier (post body).

use once_cell::sync::OnceCell;
use regex::Regex;

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("tag regex"))
}

fn re_breaks() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</p>\s*<p[^>]*>").expect("line break regex")
    })
}

/// Remove HTML tags, decode entities and trim.
///
/// `<br>` and paragraph boundaries become newlines so multi-paragraph posts stay
/// readable in the email body. Decoding can surface new markup (`&lt;b&gt;`),
/// so the pass repeats until nothing changes; every pass that changes the
/// text shortens it, which bounds the loop.
pub fn clean_html(raw: &str) -> String {
    let mut text = raw.to_string();
    loop {
        let next = clean_pass(&text);
        if next == text {
            break;
        }
        text = next;
    }
    text.trim().to_string()
}

fn clean_pass(raw: &str) -> String {
    let with_breaks = re_breaks().replace_all(raw, "\n");
    let stripped = strip_tags(&with_breaks);
    html_escape::decode_html_entities(&stripped).into_owned()
}

/// Drop anything that looks like a tag, leaving entities untouched.
pub fn strip_tags(raw: &str) -> String {
    re_tags().replace_all(raw, "").into_owned()
}
