use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::view_model::PlaybackView;
use crate::{classify, focal_char_index, Effect, PacingSettings, PunctuationClass, WordToken};

pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
    Finished,
}

/// Playback state of the focal-word display.
///
/// Only [`crate::update`] mutates it. `index` always addresses an existing
/// word (or is 0 when there are none), and at most one advance timer is
/// pending at any time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Player {
    tokens: Vec<WordToken>,
    classes: Vec<PunctuationClass>,
    index: usize,
    status: PlaybackStatus,
    settings: PacingSettings,
    pending_timer: Option<TimerId>,
    last_timer: TimerId,
    dirty: bool,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: PacingSettings) -> Self {
        Self {
            settings: settings.with_words_per_minute(settings.words_per_minute),
            ..Self::default()
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn settings(&self) -> PacingSettings {
        self.settings
    }

    pub fn tokens(&self) -> &[WordToken] {
        &self.tokens
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn current_token(&self) -> Option<&WordToken> {
        self.tokens.get(self.index)
    }

    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    /// Delay before leaving the current word at the current rate.
    pub fn current_delay(&self) -> Duration {
        self.delay_at(self.index)
    }

    /// Time left to read from the current word to the end.
    pub fn remaining_duration(&self) -> Duration {
        (self.index..self.tokens.len())
            .map(|idx| self.delay_at(idx))
            .sum()
    }

    pub fn view(&self) -> PlaybackView {
        let word = self.current_token().map(|token| token.text.clone());
        let progress = if self.tokens.len() > 1 {
            self.index as f32 / (self.tokens.len() - 1) as f32
        } else if self.status == PlaybackStatus::Finished {
            1.0
        } else {
            0.0
        };
        PlaybackView {
            index: self.index,
            token_count: self.tokens.len(),
            status: self.status,
            words_per_minute: self.settings.words_per_minute,
            focal_index: word.as_deref().map(focal_char_index).unwrap_or(0),
            punctuation: self.classes.get(self.index).copied().unwrap_or_default(),
            word,
            progress,
            remaining_ms: self.remaining_duration().as_millis() as u64,
        }
    }

    /// Returns whether the state changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn delay_at(&self, idx: usize) -> Duration {
        let class = self.classes.get(idx).copied().unwrap_or_default();
        self.settings.word_delay(class)
    }

    pub(crate) fn last_index(&self) -> usize {
        self.tokens.len().saturating_sub(1)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_status(&mut self, status: PlaybackStatus) {
        self.status = status;
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index.min(self.last_index());
    }

    pub(crate) fn settings_mut(&mut self) -> &mut PacingSettings {
        &mut self.settings
    }

    /// Replaces the words; indices are reassigned by position.
    pub(crate) fn replace_tokens(&mut self, tokens: Vec<WordToken>) {
        self.tokens = tokens
            .into_iter()
            .enumerate()
            .map(|(index, token)| WordToken {
                index,
                text: token.text,
            })
            .collect();
        self.classes = self.tokens.iter().map(|t| classify(&t.text)).collect();
        self.index = 0;
        self.status = PlaybackStatus::Idle;
    }

    pub(crate) fn cancel_pending(&mut self, effects: &mut Vec<Effect>) {
        if let Some(timer) = self.pending_timer.take() {
            effects.push(Effect::CancelAdvance { timer });
        }
    }

    /// Schedules the advance off the current word. Callers cancel first.
    pub(crate) fn schedule_advance(&mut self, effects: &mut Vec<Effect>) {
        debug_assert!(self.pending_timer.is_none());
        self.last_timer += 1;
        let timer = self.last_timer;
        self.pending_timer = Some(timer);
        effects.push(Effect::ScheduleAdvance {
            timer,
            delay: self.current_delay(),
        });
    }

    pub(crate) fn take_pending_if(&mut self, timer: TimerId) -> bool {
        if self.pending_timer == Some(timer) {
            self.pending_timer = None;
            true
        } else {
            false
        }
    }
}
