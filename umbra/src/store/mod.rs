//! Frame storage: loading, persisting and listing frames by classification.
//!
//! The calibration core only ever sees materialized [`ImageBuffer`]s; all file
//! access goes through a [`FrameStore`] at the pipeline boundary.

#[cfg(feature = "fits")]
mod fits;
mod memory;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::image_buffer::{Channel, FrameKind, FrameSet, ImageBuffer};

#[cfg(feature = "fits")]
pub use fits::{FitsStore, HEADER_KEYS};
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Frame not found: {path}")]
    NotFound { path: String },

    #[error("Invalid frame '{path}': {reason}")]
    InvalidFormat { path: String, reason: String },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.display().to_string(),
            }
        } else {
            StoreError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    }
}

/// Storage adapter for frames.
pub trait FrameStore: Send + Sync {
    /// Load one frame. Fails with [`StoreError::NotFound`] or [`StoreError::InvalidFormat`].
    fn load(&self, path: &Path) -> Result<ImageBuffer, StoreError>;

    /// Write `frame` to `path`, replacing whatever is there.
    fn persist(&self, frame: &ImageBuffer, path: &Path) -> Result<(), StoreError>;

    /// Candidate frame paths in `dir`, sorted.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError>;

    /// Frames in `dir` whose classification equals `kind` (all frames when `None`).
    fn list_matching_type(
        &self,
        dir: &Path,
        kind: Option<FrameKind>,
    ) -> Result<Vec<ImageBuffer>, StoreError> {
        let mut frames = Vec::new();
        for path in self.list(dir)? {
            let frame = self.load(&path)?;
            let Some(kind) = kind else {
                frames.push(frame);
                continue;
            };
            match type_match(&frame, kind) {
                TypeMatch::Matches => frames.push(frame),
                TypeMatch::Untyped => {
                    tracing::warn!(path = %path.display(), "Skipping frame without a type header");
                }
                TypeMatch::Other => {
                    tracing::debug!(
                        path = %path.display(),
                        found = ?frame.frame_type_value(),
                        "Skipping frame, not {kind}"
                    );
                }
            }
        }
        Ok(frames)
    }

    /// [`FrameStore::list_matching_type`] grouped by [`group_by_filter`].
    fn list_by_filter(
        &self,
        dir: &Path,
        kind: Option<FrameKind>,
    ) -> Result<FilterGroups, StoreError> {
        Ok(group_by_filter(self.list_matching_type(dir, kind)?))
    }

    /// [`FrameStore::list_matching_type`] validated into a [`FrameSet`].
    fn load_frame_set(&self, dir: &Path, kind: Option<FrameKind>) -> crate::Result<FrameSet> {
        let frames = self.list_matching_type(dir, kind)?;
        tracing::info!(dir = %dir.display(), frames = frames.len(), "Loaded frame set");
        FrameSet::new(frames)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeMatch {
    Matches,
    /// None of the type keys is present.
    Untyped,
    Other,
}

fn type_match(frame: &ImageBuffer, kind: FrameKind) -> TypeMatch {
    match frame.frame_type_value() {
        None => TypeMatch::Untyped,
        Some(_) if frame.frame_kind() == Some(kind) => TypeMatch::Matches,
        Some(_) => TypeMatch::Other,
    }
}

/// Frames sorted by the color of their filter.
#[derive(Debug, Clone, Default)]
pub struct FilterGroups {
    pub red: Vec<ImageBuffer>,
    pub green: Vec<ImageBuffer>,
    pub blue: Vec<ImageBuffer>,
    /// No `FILTER` header, or one that names no single color.
    pub unfiltered: Vec<ImageBuffer>,
}

impl FilterGroups {
    pub fn channel(&self, channel: Channel) -> &[ImageBuffer] {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }
}

/// Split `frames` by [`ImageBuffer::filter_channel`], keeping input order in each group.
pub fn group_by_filter(frames: Vec<ImageBuffer>) -> FilterGroups {
    let mut groups = FilterGroups::default();
    for frame in frames {
        match frame.filter_channel() {
            Some(Channel::Red) => groups.red.push(frame),
            Some(Channel::Green) => groups.green.push(frame),
            Some(Channel::Blue) => groups.blue.push(frame),
            None => groups.unfiltered.push(frame),
        }
    }
    tracing::debug!(
        red = groups.red.len(),
        green = groups.green.len(),
        blue = groups.blue.len(),
        unfiltered = groups.unfiltered.len(),
        "Grouped frames by filter"
    );
    groups
}
