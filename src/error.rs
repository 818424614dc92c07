use std::path::PathBuf;

use thiserror::Error;

/// Library error type for screensaver operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings are present but semantically invalid (e.g. no media paths).
    #[error("invalid settings: {0}")]
    Settings(String),

    /// YAML/serde configuration error.
    #[error(transparent)]
    SettingsParse(#[from] serde_yaml::Error),

    /// A configured media directory is missing or cannot be listed.
    #[error("unreadable media directory: {0}")]
    DirectoryUnreadable(String),

    /// A discovered file matches neither the image nor the video extension set.
    #[error("cannot classify media file {0}: neither image nor video")]
    UnclassifiedMedia(PathBuf),

    /// Discovery finished without finding a single media file.
    #[error("no media files found under the configured paths")]
    EmptyCatalog,

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
