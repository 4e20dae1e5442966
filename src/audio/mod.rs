//! Audio acquisition for quizgen.
//!
//! The fetcher downloads a video's audio track into the scratch directory and
//! hands back a [`TempAudio`], which owns the file and removes it exactly once,
//! on whichever path the pipeline leaves by.

mod downloader;
mod segment;

pub use downloader::YtDlpFetcher;
pub use segment::split_audio;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure while downloading audio.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("{0} not found. Please install it and ensure it's in your PATH")]
    ToolNotFound(String),

    #[error("Cannot prepare scratch directory: {0}")]
    Scratch(std::io::Error),

    #[error("yt-dlp execution failed: {0}")]
    Spawn(std::io::Error),

    #[error("yt-dlp failed: {0}")]
    Failed(String),

    #[error("Downloaded file not found at {}", .0.display())]
    MissingOutput(PathBuf),
}

/// Downloads the audio track for an already-validated video URL.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download best-available audio to a uniquely named scratch file.
    ///
    /// Ownership of the file passes to the caller through the returned handle.
    async fn fetch(&self, url: &str) -> Result<TempAudio, DownloadError>;
}

/// An audio file in the scratch directory, owned by one pipeline run.
///
/// Dropping the handle deletes the file. Deletion is best-effort: failures are
/// logged and never surface as errors.
#[derive(Debug)]
pub struct TempAudio {
    path: PathBuf,
    released: bool,
}

impl TempAudio {
    /// Take ownership of an existing file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    /// Path of the owned file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now. Returns whether a file was actually removed.
    pub fn release(mut self) -> bool {
        self.remove()
    }

    fn remove(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed temporary audio {:?}", self.path);
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Failed to delete temporary file {:?}: {}", self.path, e);
                false
            }
        }
    }
}

impl Drop for TempAudio {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_audio_x.webm");
        std::fs::write(&path, b"audio").unwrap();

        {
            let handle = TempAudio::new(&path);
            assert_eq!(handle.path(), path.as_path());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_release_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_audio_y.m4a");
        std::fs::write(&path, b"audio").unwrap();

        let mut handle = TempAudio::new(&path);
        assert!(handle.remove());

        // Recreate the file; a second removal must not touch it.
        std::fs::write(&path, b"other").unwrap();
        assert!(!handle.remove());
        drop(handle);
        assert!(path.exists());
    }

    #[test]
    fn test_release_of_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let handle = TempAudio::new(dir.path().join("never_written.opus"));
        assert!(!handle.release());
    }
}
