//! YouTube URL recognition.

use regex::Regex;
use std::sync::LazyLock;

/// Accepted shapes: `watch?v=<id>`, `youtu.be/<id>` and `embed/<id>`, with an
/// optional `www.` and a mandatory http(s) scheme. Anchored at the start only,
/// so trailing query parameters or path segments are tolerated.
static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^https?://
        (?:www\.)?
        (?:
            youtube\.com/watch\?v=
            | youtu\.be/
            | youtube\.com/embed/
        )
        ([\w-]+)
        ",
    )
    .expect("Invalid regex")
});

/// Check that a candidate string is a well-formed YouTube video reference.
///
/// Pure: no network access, same answer for the same input.
pub fn validate_youtube_url(url: &str) -> bool {
    YOUTUBE_URL.is_match(url)
}

/// Extract the video identifier from a URL accepted by [`validate_youtube_url`].
pub fn extract_video_id(url: &str) -> Option<&str> {
    YOUTUBE_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
