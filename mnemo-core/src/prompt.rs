//! Turning mnemonic text into an image prompt.

use once_cell::sync::Lazy;
use regex::Regex;

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9_-]*[^>]*>").expect("Invalid markup tag regex"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Strip inline markup (`<radical>`, `<kanji>`, `<reading>` ...) and collapse
/// whitespace. Returns `None` when nothing usable remains.
pub fn mnemonic_to_prompt(mnemonic: &str) -> Option<String> {
    let without_tags = MARKUP_TAG.replace_all(mnemonic, "");
    let collapsed = WHITESPACE_RUN.replace_all(without_tags.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}
