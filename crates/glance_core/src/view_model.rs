use serde::Serialize;

use crate::{PlaybackStatus, PunctuationClass};

/// Snapshot handed to the focal-word display and the highlighted text view.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlaybackView {
    pub index: usize,
    pub token_count: usize,
    pub status: PlaybackStatus,
    pub words_per_minute: u32,
    pub word: Option<String>,
    /// Char offset of the emphasised character within `word`.
    pub focal_index: usize,
    pub punctuation: PunctuationClass,
    /// 0.0 at the first word, 1.0 at the last.
    pub progress: f32,
    pub remaining_ms: u64,
}
