//! The playback sequencing state machine.
//!
//! The sequencer is a pure, synchronous core: it owns the cursor into the
//! catalog and the per-item timing policy, and is driven entirely by
//! externally delivered events. Every entry point takes the current
//! [`Instant`] and returns the commands the caller must execute; the
//! sequencer itself never blocks, sleeps or talks to a toolkit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::config::PlaybackTiming;
use crate::events::Key;
use crate::media::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before the first item is shown.
    Idle,
    ShowingImage,
    ShowingVideo,
}

/// Commands emitted by the sequencer. `ArmTimer`/`CancelTimer` are handled
/// by the driver (which owns the single outstanding countdown); the rest are
/// forwarded to the presentation adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ShowImage(PathBuf),
    PlayVideo(PathBuf),
    StopVideo,
    ArmTimer(Duration),
    CancelTimer,
    ToggleMute,
    Quit,
}

pub struct Sequencer {
    catalog: Arc<Catalog>,
    timing: PlaybackTiming,
    cursor: usize,
    phase: Phase,
    /// Wall-clock start of the current video, for the end-of-media debounce.
    video_started_at: Option<Instant>,
    /// Countdown armed for the current image; space re-arms this exact value.
    current_image_delay: Duration,
}

impl Sequencer {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, timing: PlaybackTiming) -> Self {
        assert!(!catalog.is_empty(), "sequencer requires a non-empty catalog");
        let first_image_delay = timing.first_image_delay;
        Self {
            catalog,
            timing,
            cursor: 0,
            phase: Phase::Idle,
            video_started_at: None,
            current_image_delay: first_image_delay,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Present the item at index 0 and leave `Idle`.
    pub fn start(&mut self, now: Instant) -> Vec<Command> {
        debug_assert_eq!(self.phase, Phase::Idle);
        self.cursor = 0;
        self.present_current(now)
    }

    /// Move the cursor forward one slot (wrapping) and present the new item.
    /// Wraparound is a fresh pass; no event marks it.
    pub fn advance(&mut self, now: Instant) -> Vec<Command> {
        self.cursor = (self.cursor + 1) % self.catalog.len();
        self.present_current(now)
    }

    /// The armed countdown expired. Advances only while an image is up;
    /// a timer that fires in any other phase is stale and ignored.
    pub fn on_timer(&mut self, now: Instant) -> Vec<Command> {
        match self.phase {
            Phase::ShowingImage => self.advance(now),
            _ => Vec::new(),
        }
    }

    /// Play-position report from the adapter. The video counts as finished
    /// only once the reported position has reached its duration AND at least
    /// `minimum-video-watch` has elapsed since playback started; looping
    /// short clips report positions past the end long before that.
    pub fn on_position_changed(
        &mut self,
        now: Instant,
        position: Duration,
        duration: Duration,
    ) -> Vec<Command> {
        if self.phase != Phase::ShowingVideo {
            return Vec::new();
        }
        let Some(started_at) = self.video_started_at else {
            return Vec::new();
        };
        let past_end = !duration.is_zero() && position >= duration;
        let watched_enough = now.duration_since(started_at) >= self.timing.minimum_video_watch;
        if past_end && watched_enough {
            let mut commands = vec![Command::StopVideo];
            commands.extend(self.advance(now));
            commands
        } else {
            Vec::new()
        }
    }

    /// The adapter reports the current video genuinely ended.
    pub fn on_playback_finished(&mut self, now: Instant) -> Vec<Command> {
        match self.phase {
            Phase::ShowingVideo => self.advance(now),
            _ => Vec::new(),
        }
    }

    pub fn on_key(&mut self, now: Instant, key: Key) -> Vec<Command> {
        match (key, self.phase) {
            // Space over an image continues the countdown; it does not jump.
            (Key::Space, Phase::ShowingImage) => {
                vec![Command::ArmTimer(self.current_image_delay)]
            }
            (Key::Space, Phase::ShowingVideo) => {
                let mut commands = vec![Command::StopVideo];
                commands.extend(self.advance(now));
                commands
            }
            (Key::Space, Phase::Idle) => Vec::new(),
            // Mute is orthogonal to sequencing.
            (Key::Mute, _) => vec![Command::ToggleMute],
            (Key::Escape, _) => vec![Command::Quit],
        }
    }

    /// A failed image is absorbed: the slot stays blank and the countdown
    /// keeps running, so the show moves on at the scheduled expiry; there is
    /// no retry. A video that fails to start is different: its slot has no
    /// countdown and no watcher will ever report a position, so the failure
    /// releases the slot immediately. Failures reported for anything other
    /// than the current video are stale and change nothing.
    pub fn on_render_failed(&mut self, now: Instant, path: &Path) -> Vec<Command> {
        warn!(path = %path.display(), "item failed to render; leaving slot blank");
        if self.phase == Phase::ShowingVideo && path == self.catalog.get(self.cursor).path() {
            return self.advance(now);
        }
        Vec::new()
    }

    fn present_current(&mut self, now: Instant) -> Vec<Command> {
        let item = self.catalog.get(self.cursor);
        let path = item.path().to_path_buf();
        debug!(index = self.cursor, path = %path.display(), "presenting");
        match item.kind() {
            MediaKind::Image => {
                // First image after startup or a video gets the short delay;
                // image-to-image browsing gets the steady-state delay.
                let delay = if self.phase == Phase::ShowingImage {
                    self.timing.image_delay
                } else {
                    self.timing.first_image_delay
                };
                self.phase = Phase::ShowingImage;
                self.video_started_at = None;
                self.current_image_delay = delay;
                vec![Command::ShowImage(path), Command::ArmTimer(delay)]
            }
            MediaKind::Video => {
                self.phase = Phase::ShowingVideo;
                self.video_started_at = Some(now);
                vec![Command::CancelTimer, Command::PlayVideo(path)]
            }
        }
    }
}
