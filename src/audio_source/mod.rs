//! Media source recognition for quizgen.
//!
//! Only YouTube videos are accepted as quiz sources.

mod youtube;

pub use youtube::{extract_video_id, validate_youtube_url};
