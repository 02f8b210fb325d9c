//! Word-index synchronization between the paced plain text and the
//! highlighted markup.
//!
//! Both sides enumerate words with [`glance_core::split_words`] over the same
//! ordered text walk, so word `i` of the plain text is always the span tagged
//! `data-word-index="i"` in the annotated markup.

use glance_core::{split_words, WordToken};

use crate::markup::{self, for_each_text, MarkupElement, MarkupNode};

pub const WORD_INDEX_ATTR: &str = "data-word-index";
pub const WORD_CLASS: &str = "word";

/// Markup with every word wrapped in an indexed span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedMarkup {
    pub html: String,
    pub tokens: Vec<WordToken>,
}

impl AnnotatedMarkup {
    pub fn token(&self, index: usize) -> Option<&WordToken> {
        self.tokens.get(index)
    }

    /// Resolve a clicked span's `data-word-index` value to a seekable index.
    pub fn index_from_attribute(&self, value: &str) -> Option<usize> {
        value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|index| *index < self.tokens.len())
    }
}

/// CSS selector of the span holding word `index`.
pub fn word_selector(index: usize) -> String {
    format!("span[{WORD_INDEX_ATTR}=\"{index}\"]")
}

/// Parse, reattach split punctuation, and tag every word of `html`.
pub fn annotate_html(html: &str) -> AnnotatedMarkup {
    let mut nodes = markup::parse_fragment(html);
    reattach_punctuation(&mut nodes);
    let tokens = annotate(&mut nodes);
    AnnotatedMarkup {
        html: markup::render(&nodes),
        tokens,
    }
}

/// Words of the markup in walk order, without modifying it.
pub fn markup_words(nodes: &[MarkupNode]) -> Vec<WordToken> {
    let mut tokens = Vec::new();
    for_each_text(nodes, &mut |text| {
        for word in split_words(text) {
            tokens.push(WordToken {
                index: tokens.len(),
                text: word.to_string(),
            });
        }
    });
    tokens
}

/// The text the pacing side tokenizes: the markup's words joined by single
/// spaces.
pub fn plain_text(nodes: &[MarkupNode]) -> String {
    markup_words(nodes)
        .into_iter()
        .map(|token| token.text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Move punctuation rendered directly after an inline element (`<a>world</a>,`)
/// onto the last word inside it, so the word and its punctuation form one token.
pub fn reattach_punctuation(nodes: &mut Vec<MarkupNode>) {
    for idx in 1..nodes.len() {
        let (before, after) = nodes.split_at_mut(idx);
        let (MarkupNode::Element(element), MarkupNode::Text(text)) = (&mut before[idx - 1], &mut after[0])
        else {
            continue;
        };
        if !element.is_inline() {
            continue;
        }

        let run_len: usize = text
            .chars()
            .take_while(|ch| !ch.is_whitespace() && !ch.is_alphanumeric())
            .map(char::len_utf8)
            .sum();
        if run_len == 0 {
            continue;
        }
        let Some(last) = last_text_mut(element) else {
            continue;
        };
        if last.is_empty() || last.ends_with(char::is_whitespace) {
            continue;
        }
        last.push_str(&text[..run_len]);
        text.replace_range(..run_len, "");
    }

    nodes.retain(|node| !matches!(node, MarkupNode::Text(text) if text.is_empty()));
    for node in nodes.iter_mut() {
        if let MarkupNode::Element(element) = node {
            if !element.is_opaque() {
                reattach_punctuation(&mut element.children);
            }
        }
    }
}

fn last_text_mut(element: &mut MarkupElement) -> Option<&mut String> {
    for child in element.children.iter_mut().rev() {
        match child {
            MarkupNode::Text(text) if !text.is_empty() => return Some(text),
            MarkupNode::Element(inner) if !inner.is_opaque() => {
                if let Some(text) = last_text_mut(inner) {
                    return Some(text);
                }
            }
            _ => {}
        }
    }
    None
}

/// Wrap every word in `<span class="word" data-word-index="i">`, leaving the
/// separating whitespace as plain text between spans. Returns the words.
pub fn annotate(nodes: &mut Vec<MarkupNode>) -> Vec<WordToken> {
    let mut tokens = Vec::new();
    annotate_children(nodes, &mut tokens);
    tokens
}

fn annotate_children(children: &mut Vec<MarkupNode>, tokens: &mut Vec<WordToken>) {
    for node in std::mem::take(children) {
        match node {
            MarkupNode::Text(text) => segment_text(&text, children, tokens),
            MarkupNode::Element(mut element) => {
                if !element.is_opaque() {
                    annotate_children(&mut element.children, tokens);
                }
                children.push(MarkupNode::Element(element));
            }
        }
    }
}

fn segment_text(text: &str, out: &mut Vec<MarkupNode>, tokens: &mut Vec<WordToken>) {
    let mut cursor = 0;
    for word in split_words(text) {
        // `word` is a subslice of `text`.
        let start = word.as_ptr() as usize - text.as_ptr() as usize;
        if start > cursor {
            out.push(MarkupNode::text(&text[cursor..start]));
        }
        let index = tokens.len();
        tokens.push(WordToken {
            index,
            text: word.to_string(),
        });
        out.push(MarkupNode::element(
            "span",
            vec![
                ("class".to_string(), WORD_CLASS.to_string()),
                (WORD_INDEX_ATTR.to_string(), index.to_string()),
            ],
            vec![MarkupNode::text(word)],
        ));
        cursor = start + word.len();
    }
    if cursor < text.len() {
        out.push(MarkupNode::text(&text[cursor..]));
    }
}
