//! Message types exchanged between the sequencer driver and the
//! presentation adapter.

use std::path::PathBuf;
use std::time::Duration;

/// Keys the screensaver reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Continue: re-arm the image countdown, or skip the current video.
    Space,
    /// Toggle audio mute.
    Mute,
    /// Quit the screensaver.
    Escape,
}

/// Events the presentation adapter delivers to the sequencer driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// Continuous play-position report for the current video.
    PositionChanged {
        position: Duration,
        duration: Duration,
    },
    /// The current video genuinely reached its end.
    PlaybackFinished,
    Key(Key),
    /// The adapter could not display an item; the slot stays blank.
    RenderFailed(PathBuf),
}

/// Commands the driver sends to the presentation adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationCommand {
    ShowImage(PathBuf),
    PlayVideo(PathBuf),
    StopVideo,
    ToggleMute,
    Quit,
}
