use std::time::Duration;

use glance_core::{Msg, PacingSettings, PlaybackStatus, SettingsHub};
use glance_engine::PlaybackHandle;
use pretty_assertions::assert_eq;
use tokio::time::sleep;

// At 250 wpm: 240 ms per plain word, 740 ms for a sentence end.
const TEXT: &str = "One two three.";

#[tokio::test(start_paused = true)]
async fn words_advance_on_the_pacing_schedule() {
    let handle = PlaybackHandle::spawn(PacingSettings::default());
    handle.send(Msg::LoadText(TEXT.to_string()));
    handle.send(Msg::Play);

    sleep(Duration::from_millis(100)).await;
    let view = handle.view();
    assert_eq!(view.status, PlaybackStatus::Playing);
    assert_eq!(view.index, 0);
    assert_eq!(view.word.as_deref(), Some("One"));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.view().index, 1);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.view().index, 2);

    // The last word stays up for its full sentence-end delay.
    sleep(Duration::from_millis(600)).await;
    assert_eq!(handle.view().status, PlaybackStatus::Playing);
    sleep(Duration::from_millis(200)).await;
    let view = handle.view();
    assert_eq!(view.status, PlaybackStatus::Finished);
    assert_eq!(view.index, 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pausing_freezes_the_index() {
    let handle = PlaybackHandle::spawn(PacingSettings::default());
    handle.send(Msg::LoadText(TEXT.to_string()));
    handle.send(Msg::Play);
    sleep(Duration::from_millis(300)).await;
    handle.send(Msg::Pause);

    sleep(Duration::from_secs(5)).await;
    let view = handle.view();
    assert_eq!(view.status, PlaybackStatus::Paused);
    assert_eq!(view.index, 1);

    handle.send(Msg::Play);
    sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.view().index, 2);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_every_published_view() {
    let handle = PlaybackHandle::spawn(PacingSettings::default());
    let mut views = handle.subscribe();
    handle.send(Msg::LoadText(TEXT.to_string()));
    handle.send(Msg::Play);

    let finished = views
        .wait_for(|view| view.status == PlaybackStatus::Finished)
        .await
        .expect("driver alive")
        .clone();
    assert_eq!(finished.token_count, 3);
    assert_eq!(finished.progress, 1.0);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn published_settings_reach_the_player() {
    let hub = SettingsHub::new(PacingSettings::default());
    let handle = PlaybackHandle::spawn(hub.current());
    let _subscription = handle.follow_settings(&hub);
    let mut views = handle.subscribe();

    hub.modify(|settings| settings.words_per_minute = 500);
    let view = views
        .wait_for(|view| view.words_per_minute == 500)
        .await
        .expect("driver alive")
        .clone();
    assert_eq!(view.words_per_minute, 500);
    assert_eq!(hub.subscriber_count(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn seeking_moves_the_highlight_without_playing() {
    let handle = PlaybackHandle::spawn(PacingSettings::default());
    handle.send(Msg::LoadText(TEXT.to_string()));
    handle.send(Msg::Seek(2));
    sleep(Duration::from_millis(10)).await;

    let view = handle.view();
    assert_eq!(view.index, 2);
    assert_eq!(view.status, PlaybackStatus::Paused);
    assert_eq!(view.word.as_deref(), Some("three."));
    handle.shutdown().await;
}
