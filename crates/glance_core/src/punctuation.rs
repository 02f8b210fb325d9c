use serde::{Deserialize, Serialize};

/// Pause class of a token, derived from its trailing characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PunctuationClass {
    SentenceEnd,
    Pause,
    #[default]
    None,
}

const CLOSING_QUOTES: [char; 5] = ['"', '\'', '\u{201D}', '\u{2019}', '\u{00BB}'];
const SENTENCE_END: [char; 4] = ['.', '!', '?', '\u{2026}'];
const PAUSE: [char; 4] = [',', ':', ';', '\u{2014}'];

/// Classify a token by its trailing punctuation, tolerating one closing quote
/// after it (`"done."` and `done."` are both sentence ends).
pub fn classify(token: &str) -> PunctuationClass {
    let body = match token.strip_suffix(CLOSING_QUOTES) {
        Some(rest) if !rest.is_empty() => rest,
        _ => token,
    };

    match body.chars().next_back() {
        Some(last) if SENTENCE_END.contains(&last) => PunctuationClass::SentenceEnd,
        Some(last) if PAUSE.contains(&last) => PunctuationClass::Pause,
        _ if body.ends_with("--") => PunctuationClass::Pause,
        _ => PunctuationClass::None,
    }
}
