//! Settings model and YAML loading.
//!
//! Settings are a kebab-case YAML document:
//!
//! ```yaml
//! media:
//!   paths: [/home/frame/pictures, /home/frame/clips]
//!   order: random          # random | sorted | omitted for traversal order
//!   shuffle-seed: 7        # optional, reproducible shuffles
//! playback:
//!   first-image-delay: 5s
//!   image-delay: 10s
//!   minimum-video-watch: 10s
//! power:
//!   inhibit-command: "xset s off -dpms"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    pub media: MediaSettings,
    #[serde(default)]
    pub playback: PlaybackTiming,
    #[serde(default)]
    pub power: PowerSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MediaSettings {
    /// Directories to scan recursively for media files.
    pub paths: Vec<PathBuf>,
    /// How the flattened catalog is ordered after discovery.
    #[serde(default)]
    pub order: OrderPolicy,
    /// Optional fixed seed for `order: random`, for reproducible runs.
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPolicy {
    /// Keep directory traversal order. Enumeration order is platform
    /// dependent, so callers must not rely on the exact sequence.
    #[default]
    None,
    Sorted,
    Random,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct PlaybackTiming {
    /// Display duration for an image arriving from startup or a video.
    #[serde(with = "humantime_serde")]
    pub first_image_delay: Duration,
    /// Display duration for an image that follows another image.
    #[serde(with = "humantime_serde")]
    pub image_delay: Duration,
    /// Minimum wall-clock time a video stays up before an end-of-media
    /// signal is honored. Keeps short looping clips on screen.
    #[serde(with = "humantime_serde")]
    pub minimum_video_watch: Duration,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            first_image_delay: Duration::from_secs(5),
            image_delay: Duration::from_secs(10),
            minimum_video_watch: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PowerSettings {
    /// Shell command run once at startup to keep the display awake.
    /// Best effort: failure is logged and ignored.
    #[serde(default)]
    pub inhibit_command: Option<String>,
}

impl Settings {
    /// # Errors
    /// Returns [`Error::Settings`] when required keys are missing or empty.
    pub fn validate(&self) -> Result<()> {
        if self.media.paths.is_empty() {
            return Err(Error::Settings(
                "media.paths must list at least one directory".into(),
            ));
        }
        if self.media.paths.iter().any(|p| p.as_os_str().is_empty()) {
            return Err(Error::Settings("media.paths contains an empty entry".into()));
        }
        Ok(())
    }
}

/// Load settings from a YAML file.
///
/// # Errors
/// Returns [`Error::Io`] when the file cannot be read and
/// [`Error::SettingsParse`] when it does not deserialize.
pub fn from_yaml_file(path: &Path) -> Result<Settings> {
    let raw = fs::read_to_string(path)?;
    let settings: Settings = serde_yaml::from_str(&raw)?;
    Ok(settings)
}
