//! Media file classification by extension.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Extensions handled by the still-image path.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Extensions handled by the video player. Animated gifs are played as video
/// so that looping and timing policy apply to them too.
pub const VIDEO_EXTENSIONS: &[&str] = &["gif", "mp4", "webm"];

/// Filesystem metadata artifacts that are dropped before classification.
const IGNORED_FILES: &[&str] = &["thumbs.db", ".ds_store"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

/// An immutable, classified media file. The kind is derived once from the
/// path's extension and never re-checked, even if the file disappears later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaItem {
    /// Classify `path` by extension (case-insensitive).
    ///
    /// # Errors
    /// Returns [`Error::UnclassifiedMedia`] when the extension matches
    /// neither [`IMAGE_EXTENSIONS`] nor [`VIDEO_EXTENSIONS`].
    pub fn classify(path: PathBuf) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase);
        let kind = match ext.as_deref() {
            Some(e) if IMAGE_EXTENSIONS.contains(&e) => MediaKind::Image,
            Some(e) if VIDEO_EXTENSIONS.contains(&e) => MediaKind::Video,
            _ => return Err(Error::UnclassifiedMedia(path)),
        };
        Ok(Self { path, kind })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    #[must_use]
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

/// Return `true` for files that discovery should silently drop.
#[must_use]
pub fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| {
            let name = name.to_ascii_lowercase();
            IGNORED_FILES.iter().any(|i| *i == name)
        })
}
