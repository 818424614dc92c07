//! Recursive media discovery and one-time ordering.

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::OrderPolicy;
use crate::error::{Error, Result};
use crate::media::{self, MediaItem};

/// The ordered, immutable list of media items for one run.
///
/// Built exactly once at startup; there is no invalidation or reload within
/// a run. The ordering policy is applied to the fully flattened list after
/// all roots are scanned, never per directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<MediaItem>,
}

impl Catalog {
    /// Scan `paths` recursively, classify every surviving file, then apply
    /// `order`. `seed` pins the shuffle for `OrderPolicy::Random`; `None`
    /// seeds from entropy.
    ///
    /// # Errors
    /// - [`Error::DirectoryUnreadable`] when a configured path is missing or
    ///   a directory cannot be listed (discovery aborts, nothing is skipped).
    /// - [`Error::UnclassifiedMedia`] when a non-ignored file matches neither
    ///   extension set.
    /// - [`Error::EmptyCatalog`] when discovery finds nothing at all.
    pub fn build(paths: &[PathBuf], order: OrderPolicy, seed: Option<u64>) -> Result<Self> {
        let mut items = Vec::new();

        for root in paths {
            if !root.is_dir() {
                return Err(Error::DirectoryUnreadable(
                    root.to_string_lossy().into_owned(),
                ));
            }

            let before = items.len();
            for entry in WalkDir::new(root).follow_links(true) {
                let entry = entry.map_err(|err| {
                    Error::DirectoryUnreadable(format!("{}: {err}", root.display()))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.into_path();
                if media::is_ignored(&path) {
                    debug!(path = %path.display(), "ignoring file");
                    continue;
                }
                items.push(MediaItem::classify(path)?);
            }
            info!(
                root = %root.display(),
                found = items.len() - before,
                "scanned media directory"
            );
        }

        if items.is_empty() {
            return Err(Error::EmptyCatalog);
        }

        match order {
            OrderPolicy::None => {}
            OrderPolicy::Sorted => items.sort_by(|a, b| a.path().cmp(b.path())),
            OrderPolicy::Random => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                items.shuffle(&mut rng);
            }
        }

        Ok(Self { items })
    }

    /// Build a catalog from pre-classified items, bypassing the filesystem.
    ///
    /// # Errors
    /// Returns [`Error::EmptyCatalog`] for an empty list; the sequencer
    /// relies on a non-empty catalog.
    pub fn from_items(items: Vec<MediaItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> &MediaItem {
        &self.items[index % self.items.len()]
    }

    #[must_use]
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }
}
