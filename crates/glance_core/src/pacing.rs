use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::PunctuationClass;

pub const DEFAULT_WPM: u32 = 250;
pub const MAX_WPM: u32 = 2_000;
pub const MIN_WORD_DELAY_MS: u64 = 30;
/// Punctuation delays are expressed at this rate and scaled to the current one.
pub const REFERENCE_WPM: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingSettings {
    pub words_per_minute: u32,
    /// Extra delay after a sentence-ending word, at [`REFERENCE_WPM`].
    pub sentence_end_delay_ms: u32,
    /// Extra delay after a pause word (comma, colon, dash), at [`REFERENCE_WPM`].
    pub speech_break_delay_ms: u32,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WPM,
            sentence_end_delay_ms: 500,
            speech_break_delay_ms: 250,
        }
    }
}

impl PacingSettings {
    pub fn with_words_per_minute(mut self, wpm: u32) -> Self {
        self.words_per_minute = clamp_wpm(wpm);
        self
    }

    /// Time a word stays on screen before the next one replaces it.
    pub fn word_delay(&self, class: PunctuationClass) -> Duration {
        let wpm = f64::from(clamp_wpm(self.words_per_minute));
        let base = (60_000.0 / wpm).round().max(MIN_WORD_DELAY_MS as f64);
        let scale = f64::from(REFERENCE_WPM) / wpm;
        let extra = match class {
            PunctuationClass::SentenceEnd => f64::from(self.sentence_end_delay_ms) * scale,
            PunctuationClass::Pause => f64::from(self.speech_break_delay_ms) * scale,
            PunctuationClass::None => 0.0,
        };
        Duration::from_millis((base + extra).round() as u64)
    }
}

pub fn clamp_wpm(wpm: u32) -> u32 {
    wpm.clamp(1, MAX_WPM)
}
