// Directory playlist with a wrap-around cursor

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tunestream_core::{AudioError, Result};

/// Upper bound on scanned entries
pub const MAX_ENTRIES: usize = 256;

/// Within this much of a track's start, "previous" moves back instead of restarting
pub const RESTART_THRESHOLD: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct Playlist {
    dir: PathBuf,
    names: Vec<String>,
    current: usize,
}

fn is_mp3(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("mp3"))
        .unwrap_or(false)
}

fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl Playlist {
    /// Collect the `.mp3` files directly inside `dir`, sorted by name ignoring case
    pub fn scan(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            AudioError::LoadError(format!("cannot read music directory {}: {}", dir.display(), e))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            if names.len() >= MAX_ENTRIES {
                log::warn!("Playlist truncated at {} entries", MAX_ENTRIES);
                break;
            }
            let entry = entry?;
            // Symlinks and directories are skipped
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_mp3(&name) {
                names.push(name);
            }
        }

        if names.is_empty() {
            return Err(AudioError::LoadError(format!(
                "no MP3 files found in {}",
                dir.display()
            )));
        }

        names.sort_by(|a, b| compare_ignore_case(a, b));
        log::info!("Loaded {} tracks from {}", names.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            names,
            current: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn current_name(&self) -> &str {
        &self.names[self.current]
    }

    pub fn current_path(&self) -> PathBuf {
        self.dir.join(self.current_name())
    }

    pub fn next(&mut self) {
        self.current = (self.current + 1) % self.names.len();
    }

    /// Step back one track when `elapsed` is short, otherwise stay put so the
    /// caller restarts the current one. Returns whether the cursor moved.
    pub fn prev_or_restart(&mut self, elapsed: Duration) -> bool {
        if elapsed >= RESTART_THRESHOLD {
            return false;
        }
        self.current = self
            .current
            .checked_sub(1)
            .unwrap_or(self.names.len() - 1);
        true
    }
}
