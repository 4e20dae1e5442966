//! yt-dlp backed audio fetcher.

use super::{AudioFetcher, DownloadError, TempAudio};
use crate::config::{Settings, ToolSettings};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Prefix shared by every scratch file this fetcher creates.
const TEMP_PREFIX: &str = "temp_audio_";

/// Downloads audio with yt-dlp into the scratch directory.
pub struct YtDlpFetcher {
    ytdlp: String,
    ffmpeg_location: Option<String>,
    scratch_dir: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(tools: &ToolSettings, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp: tools.ytdlp.clone(),
            ffmpeg_location: tools
                .ffmpeg_location
                .as_deref()
                .map(|l| Settings::expand_path(l).to_string_lossy().into_owned()),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.tools, settings.scratch_dir())
    }

    fn build_command(&self, url: &str, template: &Path) -> Command {
        let mut cmd = Command::new(&self.ytdlp);
        cmd.arg("--format").arg("bestaudio/best")
            .arg("--output").arg(template)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg("--no-progress")
            // --print implies --simulate unless told otherwise
            .arg("--no-simulate")
            .arg("--print").arg("after_move:filepath");

        if let Some(location) = &self.ffmpeg_location {
            cmd.arg("--ffmpeg-location").arg(location);
        }

        cmd.arg(url)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<TempAudio, DownloadError> {
        std::fs::create_dir_all(&self.scratch_dir).map_err(DownloadError::Scratch)?;

        let stem = format!("{}{}", TEMP_PREFIX, Uuid::new_v4().simple());
        let template = self.scratch_dir.join(format!("{}.%(ext)s", stem));
        let leftovers = LeftoverGuard::new(&self.scratch_dir, &stem);

        info!("Downloading audio to {:?}", template);

        let output = match self.build_command(url, &template).output().await {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DownloadError::ToolNotFound(self.ytdlp.clone()));
            }
            Err(e) => return Err(DownloadError::Spawn(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Failed(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let downloaded = reported_path(&stdout)
            .filter(|p| p.exists())
            .or_else(|| find_by_stem(&self.scratch_dir, &stem));

        match downloaded {
            Some(path) => {
                debug!("Audio saved to {:?}", path);
                leftovers.disarm();
                Ok(TempAudio::new(path))
            }
            None => Err(DownloadError::MissingOutput(template)),
        }
    }
}

/// Last non-empty line of yt-dlp's `--print after_move:filepath` output.
fn reported_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(PathBuf::from)
}

/// Locate a finished download by its unique stem, ignoring partial files.
fn find_by_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .flatten()
        .map(|entry| entry.path())
        .find(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            name.starts_with(stem) && !name.ends_with(".part") && !name.ends_with(".ytdl")
        })
}

/// Removes every file under a download's stem unless disarmed.
///
/// Covers failed downloads as well as a `fetch` future dropped mid-download,
/// before any [`TempAudio`] owns the file.
struct LeftoverGuard<'a> {
    dir: &'a Path,
    stem: &'a str,
    armed: bool,
}

impl<'a> LeftoverGuard<'a> {
    fn new(dir: &'a Path, stem: &'a str) -> Self {
        Self {
            dir,
            stem,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LeftoverGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            remove_leftovers(self.dir, self.stem);
        }
    }
}

/// Remove anything a failed download left behind under this stem.
fn remove_leftovers(dir: &Path, stem: &str) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(stem) {
            if let Err(e) = std::fs::remove_file(entry.path()) {
                debug!("Could not remove leftover {:?}: {}", entry.path(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_path_takes_last_line() {
        let stdout = "\n/tmp/quizgen/temp_audio_abc.webm\n\n";
        assert_eq!(
            reported_path(stdout),
            Some(PathBuf::from("/tmp/quizgen/temp_audio_abc.webm"))
        );
        assert_eq!(reported_path("  \n"), None);
    }

    #[test]
    fn test_find_by_stem_skips_partials() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("temp_audio_abc.webm.part"), b"").unwrap();
        assert_eq!(find_by_stem(dir.path(), "temp_audio_abc"), None);

        std::fs::write(dir.path().join("temp_audio_abc.m4a"), b"").unwrap();
        std::fs::write(dir.path().join("temp_audio_other.m4a"), b"").unwrap();
        assert_eq!(
            find_by_stem(dir.path(), "temp_audio_abc"),
            Some(dir.path().join("temp_audio_abc.m4a"))
        );
    }

    #[test]
    fn test_remove_leftovers_only_touches_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("temp_audio_abc.webm.part"), b"").unwrap();
        std::fs::write(dir.path().join("temp_audio_keep.m4a"), b"").unwrap();

        remove_leftovers(dir.path(), "temp_audio_abc");

        assert!(!dir.path().join("temp_audio_abc.webm.part").exists());
        assert!(dir.path().join("temp_audio_keep.m4a").exists());
    }

    /// Write an executable stand-in for yt-dlp that honours `--output`.
    #[cfg(unix)]
    fn fake_ytdlp(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yt-dlp");
        let script = format!(
            "#!/bin/sh\n\
             while [ $# -gt 0 ]; do\n\
               if [ \"$1\" = \"--output\" ]; then out=\"$2\"; fi\n\
               shift\n\
             done\n\
             target=$(printf '%s' \"$out\" | sed 's/%(ext)s/webm/')\n\
             {}\n",
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_download_is_owned_by_handle() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let tools = ToolSettings {
            ytdlp: fake_ytdlp(bin.path(), "echo audio > \"$target\"\necho \"$target\""),
            ..ToolSettings::default()
        };
        let fetcher = YtDlpFetcher::new(&tools, scratch.path());

        let audio = fetcher.fetch("https://youtu.be/dQw4w9WgXcQ").await.unwrap();
        assert!(audio.path().exists());
        assert_eq!(audio.path().extension().unwrap(), "webm");

        drop(audio);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancelled_fetch_leaves_scratch_empty() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let tools = ToolSettings {
            ytdlp: fake_ytdlp(
                bin.path(),
                ": > \"$target.part\"\nsleep 1\necho audio > \"$target\"\necho \"$target\"",
            ),
            ..ToolSettings::default()
        };
        let fetcher = YtDlpFetcher::new(&tools, scratch.path());

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            fetcher.fetch("https://youtu.be/dQw4w9WgXcQ"),
        )
        .await;
        assert!(result.is_err());

        // Long enough for an unkilled download to have finished writing.
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        let left: Vec<_> = std::fs::read_dir(scratch.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name())
            .collect();
        assert!(left.is_empty(), "leftover files: {:?}", left);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_download_removes_partials() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let tools = ToolSettings {
            ytdlp: fake_ytdlp(
                bin.path(),
                ": > \"$target.part\"\necho 'ERROR: Video unavailable' >&2\nexit 1",
            ),
            ..ToolSettings::default()
        };
        let fetcher = YtDlpFetcher::new(&tools, scratch.path());

        let err = fetcher.fetch("https://youtu.be/dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(err.to_string(), "yt-dlp failed: ERROR: Video unavailable");
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_binary_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolSettings {
            ytdlp: "quizgen-no-such-ytdlp-binary".to_string(),
            ..ToolSettings::default()
        };
        let fetcher = YtDlpFetcher::new(&tools, dir.path());

        let err = fetcher
            .fetch("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
