// src/session/title.rs
use regex::Regex;

use crate::models::DEFAULT_CHAT_TITLE;

const MAX_TITLE_WORDS: usize = 7;

lazy_static::lazy_static! {
    // From a `?` to the end of the prompt, provided no line break follows it.
    static ref FROM_QUESTION_MARK: Regex = Regex::new(r"\?[^\r\n\x{2028}\x{2029}]*$").unwrap();
    // Anything that is neither an ASCII word character nor whitespace.
    static ref NON_WORD: Regex = Regex::new(r"[^A-Za-z0-9_\s]").unwrap();
}

/// Short chat title derived from the first prompt of a chat.
pub fn derive_title(prompt: &str) -> String {
    let without_question = FROM_QUESTION_MARK.replace(prompt, "");
    let cleaned = NON_WORD.replace_all(&without_question, "");
    let title = cleaned
        .split_whitespace()
        .take(MAX_TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    let mut chars = title.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => DEFAULT_CHAT_TITLE.to_string(),
    }
}
