use glance_core::{classify, collapse_whitespace, tokenize, word_count, PunctuationClass, WordToken};
use pretty_assertions::assert_eq;

fn texts(tokens: &[WordToken]) -> Vec<&str> {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

#[test]
fn splits_on_whitespace_runs_and_keeps_punctuation() {
    let tokens = tokenize("  Hello,\tworld!\n\n  It's   well-known: 3.14 in the U.S.A. ... ok  ");
    assert_eq!(
        texts(&tokens),
        vec![
            "Hello,",
            "world!",
            "It's",
            "well-known:",
            "3.14",
            "in",
            "the",
            "U.S.A.",
            "...",
            "ok"
        ]
    );
    let indices: Vec<usize> = tokens.iter().map(|t| t.index).collect();
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
}

#[test]
fn non_breaking_space_separates_words() {
    assert_eq!(texts(&tokenize("a\u{00A0}b")), vec!["a", "b"]);
}

#[test]
fn empty_and_blank_text_have_no_tokens() {
    assert!(tokenize("").is_empty());
    assert!(tokenize(" \n\t ").is_empty());
    assert_eq!(word_count("   "), 0);
}

#[test]
fn joining_tokens_reconstructs_collapsed_text() {
    let samples = [
        "plain words",
        "  leading and trailing  ",
        "tabs\tand\nnewlines\r\nmixed",
        "punctuation, stays; attached — always!",
        "unicode: naïve café “quoted”",
    ];
    for sample in samples {
        let joined = texts(&tokenize(sample)).join(" ");
        assert_eq!(joined, collapse_whitespace(sample));
        let stripped: String = sample.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(joined.replace(' ', ""), stripped);
    }
}

#[test]
fn tokenization_is_stable() {
    let text = "Same text, same indices.";
    assert_eq!(tokenize(text), tokenize(text));
}

#[test]
fn sentence_ends() {
    for token in ["end.", "what?", "wow!", "really?!", "so...", "trail…", "U.S.A.", "\"done.\"", "done.\u{201D}", "ok.'"] {
        assert_eq!(classify(token), PunctuationClass::SentenceEnd, "{token}");
    }
}

#[test]
fn pauses() {
    for token in ["well,", "note:", "semi;", "dash\u{2014}", "dash--", "said,\"", "\u{2014}"] {
        assert_eq!(classify(token), PunctuationClass::Pause, "{token}");
    }
}

#[test]
fn plain_words() {
    for token in ["word", "3.14", "well-known", "it's", "\"quoted\"", "(aside)", "-", ""] {
        assert_eq!(classify(token), PunctuationClass::None, "{token}");
    }
}

#[test]
fn classification_is_total_and_exclusive() {
    let tokens = tokenize("A, b. c; d! e-- f\u{2014} g? h: i \"j.\" k");
    for token in tokens {
        let class = classify(&token.text);
        let matches = [
            class == PunctuationClass::SentenceEnd,
            class == PunctuationClass::Pause,
            class == PunctuationClass::None,
        ];
        assert_eq!(matches.iter().filter(|m| **m).count(), 1);
    }
}
