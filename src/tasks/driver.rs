//! Async driver for the sequencer.
//!
//! Owns the single outstanding countdown and the channels to and from the
//! presentation adapter. Events are consumed strictly in arrival order from
//! one mpsc receiver; arming a new countdown implicitly cancels the pending
//! one, so at most one advance timer ever exists.

use anyhow::Result;
use std::time::Instant;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::sleep_until;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::events::{AdapterEvent, PresentationCommand};
use crate::sequencer::{Command, Sequencer};

pub async fn run(
    mut sequencer: Sequencer,
    mut events: Receiver<AdapterEvent>,
    to_adapter: Sender<PresentationCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut deadline: Option<tokio::time::Instant> = None;

    let startup = sequencer.start(Instant::now());
    if !dispatch(startup, &mut deadline, &to_adapter).await {
        return Ok(());
    }

    loop {
        let commands = select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting driver");
                break;
            }

            maybe_ev = events.recv() => {
                let Some(event) = maybe_ev else {
                    debug!("adapter event channel closed");
                    break;
                };
                let now = Instant::now();
                match event {
                    AdapterEvent::PositionChanged { position, duration } => {
                        sequencer.on_position_changed(now, position, duration)
                    }
                    AdapterEvent::PlaybackFinished => sequencer.on_playback_finished(now),
                    AdapterEvent::Key(key) => sequencer.on_key(now, key),
                    AdapterEvent::RenderFailed(path) => sequencer.on_render_failed(now, &path),
                }
            }

            // The unwrap_or fallback is never polled: the branch is disabled
            // while no countdown is armed.
            _ = sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)),
                if deadline.is_some() =>
            {
                deadline = None;
                sequencer.on_timer(Instant::now())
            }
        };

        if !dispatch(commands, &mut deadline, &to_adapter).await {
            break;
        }
    }

    Ok(())
}

/// Apply timer commands locally and forward the rest to the adapter.
/// Returns `false` once the driver should stop (quit issued or adapter gone).
async fn dispatch(
    commands: Vec<Command>,
    deadline: &mut Option<tokio::time::Instant>,
    to_adapter: &Sender<PresentationCommand>,
) -> bool {
    for command in commands {
        let forwarded = match command {
            Command::ArmTimer(delay) => {
                *deadline = Some(tokio::time::Instant::now() + delay);
                continue;
            }
            Command::CancelTimer => {
                *deadline = None;
                continue;
            }
            Command::ShowImage(path) => PresentationCommand::ShowImage(path),
            Command::PlayVideo(path) => PresentationCommand::PlayVideo(path),
            Command::StopVideo => PresentationCommand::StopVideo,
            Command::ToggleMute => PresentationCommand::ToggleMute,
            Command::Quit => {
                let _ = to_adapter.send(PresentationCommand::Quit).await;
                return false;
            }
        };
        if to_adapter.send(forwarded).await.is_err() {
            debug!("adapter command channel closed");
            return false;
        }
    }
    true
}
