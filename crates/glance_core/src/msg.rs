#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Start or resume playback; restarts from the top when finished.
    Play,
    /// Stop advancing, keeping the current word.
    Pause,
    /// Play when not playing, pause otherwise.
    TogglePlay,
    /// Jump back to the first word, keeping the play/pause mode.
    Restart,
    /// Jump to a word index (clamped), e.g. from a scrubber or a click in the
    /// highlighted text.
    Seek(usize),
    /// Relative seek by a number of words.
    Step(isize),
    SetWordsPerMinute(u32),
    SetPauseDelays {
        sentence_end_ms: u32,
        speech_break_ms: u32,
    },
    /// Replace the text; playback resets to the first word.
    LoadText(String),
    /// Replace the text with pre-indexed words, e.g. from the markup synchronizer.
    LoadTokens(Vec<crate::WordToken>),
    /// A scheduled advance fired.
    AdvanceDue { timer: crate::TimerId },
}
