use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{FrameStore, StoreError};
use crate::image_buffer::ImageBuffer;

/// In-process store keyed by path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    frames: Mutex<BTreeMap<PathBuf, ImageBuffer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, frame: ImageBuffer) {
        self.frames.lock().insert(path.into(), frame);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.frames.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.frames.lock().keys().cloned().collect()
    }
}

impl FrameStore for MemoryStore {
    fn load(&self, path: &Path) -> Result<ImageBuffer, StoreError> {
        self.frames
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.display().to_string(),
            })
    }

    fn persist(&self, frame: &ImageBuffer, path: &Path) -> Result<(), StoreError> {
        self.insert(path, frame.clone());
        Ok(())
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        Ok(self
            .frames
            .lock()
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }
}
