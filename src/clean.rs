//! Grounding markup removal.
//!
//! Grounded OCR output wraps detected regions in `<|ref|>…<|/ref|>` and
//! `<|det|>…<|/det|>` spans. Those spans, and any dangling tags left by a
//! truncated generation, are noise in Markdown and get stripped.

use once_cell::sync::Lazy;
use regex::Regex;

// Closing `>` is optional so truncated output still matches.
static REF_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<\|ref\|.*?<\|/ref\|>?").expect("valid regex"));
static DET_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<\|det\|.*?<\|/det\|>?").expect("valid regex"));
static STRAY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\|/?(?:ref|det)\|>?").expect("valid regex"));
static TRAILING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+\n").expect("valid regex"));

/// Strip grounding spans and stray tags, drop trailing spaces before line
/// breaks, and trim the result.
///
/// Idempotent: `clean_grounding(&clean_grounding(s)) == clean_grounding(s)`.
pub fn clean_grounding(text: &str) -> String {
    let mut current = text.to_string();

    // Removing a tag can splice a new one together, so repeat until stable.
    loop {
        let next = strip_markup(&current);
        if next == current {
            break;
        }
        current = next;
    }

    TRAILING_SPACE
        .replace_all(&current, "\n")
        .trim()
        .to_string()
}

fn strip_markup(text: &str) -> String {
    let text = REF_SPAN.replace_all(text, "");
    let text = DET_SPAN.replace_all(&text, "");
    STRAY_TAG.replace_all(&text, "").into_owned()
}
