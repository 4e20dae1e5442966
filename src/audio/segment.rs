//! Splitting long audio into fixed-length segments with ffmpeg.

use crate::error::{QuizgenError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument};

/// Split `source` into consecutive segments of `segment_seconds` inside `output_dir`.
///
/// Segments are stream-copied (no re-encode) and returned in playback order.
#[instrument(skip(ffmpeg, output_dir))]
pub async fn split_audio(
    ffmpeg: &str,
    source: &Path,
    output_dir: &Path,
    segment_seconds: u32,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("m4a");
    let pattern = output_dir.join(format!("segment_%04d.{}", ext));

    let result = Command::new(ffmpeg)
        .arg("-i").arg(source)
        .arg("-f").arg("segment")
        .arg("-segment_time").arg(segment_seconds.max(1).to_string())
        .arg("-reset_timestamps").arg("1")
        .arg("-vn")
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(&pattern)
        .kill_on_drop(true)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(QuizgenError::ToolNotFound(ffmpeg.to_string()));
        }
        Err(e) => return Err(QuizgenError::Media(format!("ffmpeg execution failed: {e}"))),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(QuizgenError::Media(format!("ffmpeg segmenting failed: {}", stderr.trim())));
    }

    let segments = list_segments(output_dir)?;
    if segments.is_empty() {
        return Err(QuizgenError::Media("ffmpeg produced no segments".to_string()));
    }

    info!("Split audio into {} segments", segments.len());
    Ok(segments)
}

/// Segment files in name order, which is playback order for `segment_%04d`.
fn list_segments(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut segments: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("segment_"))
        })
        .collect();
    segments.sort();
    Ok(segments)
}
