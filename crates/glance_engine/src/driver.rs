use std::pin::Pin;

use glance_core::{
    update, Effect, Msg, PacingSettings, PlaybackView, Player, SettingsHub, Subscription, TimerId,
};
use glance_logging::{glance_debug, glance_trace};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

enum DriverCommand {
    Dispatch(Msg),
    Shutdown,
}

/// Runs a [`Player`] on the tokio runtime: messages in, view snapshots out.
///
/// The task owns the only advance timer. `ScheduleAdvance` arms it,
/// `CancelAdvance` disarms it, and when it fires the task feeds
/// `Msg::AdvanceDue` back into the state machine.
pub struct PlaybackHandle {
    cmd_tx: mpsc::UnboundedSender<DriverCommand>,
    view_rx: watch::Receiver<PlaybackView>,
    task: JoinHandle<()>,
}

impl PlaybackHandle {
    /// Must be called from within a tokio runtime.
    pub fn spawn(settings: PacingSettings) -> Self {
        let player = Player::with_settings(settings);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(player.view());
        let task = tokio::spawn(run(player, cmd_rx, view_tx));
        Self {
            cmd_tx,
            view_rx,
            task,
        }
    }

    pub fn send(&self, msg: Msg) {
        if self.cmd_tx.send(DriverCommand::Dispatch(msg)).is_err() {
            glance_debug!("Playback task is gone; message dropped");
        }
    }

    pub fn view(&self) -> PlaybackView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackView> {
        self.view_rx.clone()
    }

    /// Forward every rate or pause-delay change published on `hub`.
    pub fn follow_settings(&self, hub: &SettingsHub<PacingSettings>) -> Subscription {
        let cmd_tx = self.cmd_tx.clone();
        hub.subscribe(move |settings: &PacingSettings| {
            let _ = cmd_tx.send(DriverCommand::Dispatch(Msg::SetWordsPerMinute(
                settings.words_per_minute,
            )));
            let _ = cmd_tx.send(DriverCommand::Dispatch(Msg::SetPauseDelays {
                sentence_end_ms: settings.sentence_end_delay_ms,
                speech_break_ms: settings.speech_break_delay_ms,
            }));
        })
    }

    /// Stops the task; any pending advance is dropped with it.
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(DriverCommand::Shutdown);
        let _ = self.task.await;
    }
}

enum Wake {
    Command(Option<DriverCommand>),
    Timer(TimerId),
}

async fn run(
    mut player: Player,
    mut cmd_rx: mpsc::UnboundedReceiver<DriverCommand>,
    view_tx: watch::Sender<PlaybackView>,
) {
    let mut pending: Option<(TimerId, Pin<Box<Sleep>>)> = None;

    loop {
        let wake = match pending.as_mut() {
            Some((timer, sleep)) => {
                let timer = *timer;
                tokio::select! {
                    command = cmd_rx.recv() => Wake::Command(command),
                    () = sleep.as_mut() => Wake::Timer(timer),
                }
            }
            None => Wake::Command(cmd_rx.recv().await),
        };

        let msg = match wake {
            Wake::Command(Some(DriverCommand::Dispatch(msg))) => msg,
            Wake::Command(Some(DriverCommand::Shutdown) | None) => break,
            Wake::Timer(timer) => {
                pending = None;
                Msg::AdvanceDue { timer }
            }
        };

        let (next, effects) = update(player, msg);
        player = next;
        for effect in effects {
            match effect {
                Effect::CancelAdvance { timer } => {
                    if pending.as_ref().is_some_and(|(armed, _)| *armed == timer) {
                        pending = None;
                    }
                }
                Effect::ScheduleAdvance { timer, delay } => {
                    glance_trace!("Advance {} in {:?}", timer, delay);
                    pending = Some((timer, Box::pin(tokio::time::sleep(delay))));
                }
            }
        }

        if player.consume_dirty() {
            view_tx.send_replace(player.view());
        }
    }
    glance_debug!("Playback task stopped");
}
