//! Glance core: tokenization, punctuation pacing and the pure playback state machine.
mod effect;
mod msg;
mod pacing;
mod punctuation;
pub mod settings;
mod state;
mod token;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use pacing::{
    clamp_wpm, PacingSettings, DEFAULT_WPM, MAX_WPM, MIN_WORD_DELAY_MS, REFERENCE_WPM,
};
pub use punctuation::{classify, PunctuationClass};
pub use settings::{SettingsHub, Subscription};
pub use state::{PlaybackStatus, Player, TimerId};
pub use token::{collapse_whitespace, focal_char_index, split_words, tokenize, word_count, WordToken};
pub use update::update;
pub use view_model::PlaybackView;
