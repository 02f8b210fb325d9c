use glance_logging::glance_debug;

use crate::pacing::clamp_wpm;
use crate::{tokenize, Effect, Msg, PlaybackStatus, Player, WordToken};

/// Pure update function: applies a message to the player and returns any effects.
///
/// Every transition that touches the play status, the rate, the words or the
/// index cancels the pending advance before scheduling a new one, so at most
/// one advance is ever outstanding.
pub fn update(mut state: Player, msg: Msg) -> (Player, Vec<Effect>) {
    let mut effects = Vec::new();
    match msg {
        Msg::Play => play(&mut state, &mut effects),
        Msg::Pause => pause(&mut state, &mut effects),
        Msg::TogglePlay => {
            if state.is_playing() {
                pause(&mut state, &mut effects);
            } else {
                play(&mut state, &mut effects);
            }
        }
        Msg::Restart => {
            state.cancel_pending(&mut effects);
            state.set_index(0);
            if state.is_playing() {
                state.schedule_advance(&mut effects);
            } else {
                state.set_status(PlaybackStatus::Idle);
            }
            state.mark_dirty();
        }
        Msg::Seek(target) => seek(&mut state, target, &mut effects),
        Msg::Step(delta) => {
            let target = state.index().saturating_add_signed(delta);
            seek(&mut state, target, &mut effects);
        }
        Msg::SetWordsPerMinute(wpm) => {
            let wpm = clamp_wpm(wpm);
            if wpm != state.settings().words_per_minute {
                state.settings_mut().words_per_minute = wpm;
                reschedule_if_playing(&mut state, &mut effects);
                state.mark_dirty();
            }
        }
        Msg::SetPauseDelays {
            sentence_end_ms,
            speech_break_ms,
        } => {
            let current = state.settings();
            if (current.sentence_end_delay_ms, current.speech_break_delay_ms)
                != (sentence_end_ms, speech_break_ms)
            {
                let settings = state.settings_mut();
                settings.sentence_end_delay_ms = sentence_end_ms;
                settings.speech_break_delay_ms = speech_break_ms;
                reschedule_if_playing(&mut state, &mut effects);
                state.mark_dirty();
            }
        }
        Msg::LoadText(text) => load(&mut state, tokenize(&text), &mut effects),
        Msg::LoadTokens(tokens) => load(&mut state, tokens, &mut effects),
        Msg::AdvanceDue { timer } => advance(&mut state, timer, &mut effects),
    }

    (state, effects)
}

fn play(state: &mut Player, effects: &mut Vec<Effect>) {
    if state.token_count() == 0 {
        return;
    }
    match state.status() {
        PlaybackStatus::Playing => return,
        PlaybackStatus::Finished => state.set_index(0),
        PlaybackStatus::Idle | PlaybackStatus::Paused => {}
    }
    state.cancel_pending(effects);
    state.set_status(PlaybackStatus::Playing);
    state.schedule_advance(effects);
    state.mark_dirty();
}

fn pause(state: &mut Player, effects: &mut Vec<Effect>) {
    if !state.is_playing() {
        return;
    }
    state.cancel_pending(effects);
    state.set_status(PlaybackStatus::Paused);
    state.mark_dirty();
}

fn seek(state: &mut Player, target: usize, effects: &mut Vec<Effect>) {
    if state.token_count() == 0 {
        return;
    }
    state.cancel_pending(effects);
    state.set_index(target);
    if state.is_playing() {
        state.schedule_advance(effects);
    } else if !(state.status() == PlaybackStatus::Idle && state.index() == 0) {
        state.set_status(PlaybackStatus::Paused);
    }
    state.mark_dirty();
}

fn load(state: &mut Player, tokens: Vec<WordToken>, effects: &mut Vec<Effect>) {
    state.cancel_pending(effects);
    state.replace_tokens(tokens);
    state.mark_dirty();
}

fn advance(state: &mut Player, timer: crate::TimerId, effects: &mut Vec<Effect>) {
    if !state.take_pending_if(timer) {
        glance_debug!("Ignoring stale advance timer {}", timer);
        return;
    }
    if !state.is_playing() {
        return;
    }

    if state.index() >= state.last_index() {
        state.set_status(PlaybackStatus::Finished);
    } else {
        state.set_index(state.index() + 1);
        state.schedule_advance(effects);
    }
    state.mark_dirty();
}

fn reschedule_if_playing(state: &mut Player, effects: &mut Vec<Effect>) {
    if state.is_playing() {
        state.cancel_pending(effects);
        state.schedule_advance(effects);
    }
}
