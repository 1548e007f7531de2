// Track access by path

use crate::reader::TrackSource;
use std::fs::File;
use std::path::Path;
use tunestream_core::{AudioError, Result};

/// Opens the byte source for a track
pub trait TrackOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<TrackSource>;
}

/// Opens tracks from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsOpener;

impl TrackOpener for FsOpener {
    fn open(&self, path: &Path) -> Result<TrackSource> {
        let file = File::open(path).map_err(|e| {
            AudioError::LoadError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(Box::new(file))
    }
}
