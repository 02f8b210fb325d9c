use serde::{Deserialize, Serialize};

/// One word of a tokenization pass. `text` keeps any attached punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordToken {
    pub index: usize,
    pub text: String,
}

/// Split on runs of whitespace, never on punctuation.
///
/// This is the single splitting rule shared by the plain-text tokenizer and
/// the markup synchronizer; both must enumerate words identically.
pub fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(char::is_whitespace).filter(|word| !word.is_empty())
}

/// Tokenize `text` into indexed words. Re-tokenizing identical text yields
/// identical indices.
pub fn tokenize(text: &str) -> Vec<WordToken> {
    split_words(text)
        .enumerate()
        .map(|(index, word)| WordToken {
            index,
            text: word.to_string(),
        })
        .collect()
}

/// The trimmed, whitespace-collapsed form of `text`; equal to the tokens
/// joined by a single space.
pub fn collapse_whitespace(text: &str) -> String {
    split_words(text).collect::<Vec<_>>().join(" ")
}

pub fn word_count(text: &str) -> usize {
    split_words(text).count()
}

/// Char offset of the focal (optimal recognition) character of `word`.
///
/// Leading punctuation is skipped and only letters and digits count towards
/// the word length, so `"(hello"` focuses the same letter as `"hello"`.
pub fn focal_char_index(word: &str) -> usize {
    let leading = word
        .chars()
        .take_while(|ch| !ch.is_alphanumeric())
        .count();
    let letters = word.chars().filter(|ch| ch.is_alphanumeric()).count();
    if letters == 0 {
        return 0;
    }

    let offset = match letters {
        0..=1 => 0,
        2..=5 => 1,
        6..=9 => 2,
        10..=13 => 3,
        _ => 4,
    };
    leading + offset
}

#[cfg(test)]
mod tests {
    use super::focal_char_index;

    #[test]
    fn focal_index_grows_with_word_length() {
        assert_eq!(focal_char_index("a"), 0);
        assert_eq!(focal_char_index("word"), 1);
        assert_eq!(focal_char_index("reading"), 2);
        assert_eq!(focal_char_index("extraordinary"), 3);
        assert_eq!(focal_char_index("incomprehensibilities"), 4);
    }

    #[test]
    fn focal_index_skips_leading_punctuation() {
        assert_eq!(focal_char_index("\"word"), 2);
        assert_eq!(focal_char_index("..."), 0);
        assert_eq!(focal_char_index(""), 0);
    }
}
