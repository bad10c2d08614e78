// What gets published: the video, its caption, the cover choice and the
// target platforms.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PublishError, Result};
use crate::temphost::ensure_uploadable;
use crate::timestamp::parse_timestamp_ms;

/// A platform the tool knows how to publish to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    #[value(name = "tiktok")]
    TikTok,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Instagram, Platform::TikTok];
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Instagram => f.write_str("Instagram"),
            Platform::TikTok => f.write_str("TikTok"),
        }
    }
}

/// How the cover image is produced. The variants are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoverSpec {
    #[default]
    None,
    /// Let the platform extract the frame at this offset.
    FrameOffsetMs(u64),
    /// An image that is already publicly reachable.
    ExternalUrl(String),
    /// A local image that must go through the temp host first.
    LocalImage(PathBuf),
}

impl CoverSpec {
    /// Build the cover choice from the raw `--thumbnail` / `--thumbnail-at`
    /// values. Supplying both is an input error.
    pub fn from_options(thumbnail: Option<&str>, thumbnail_at: Option<&str>) -> Result<Self> {
        match (thumbnail, thumbnail_at) {
            (Some(_), Some(_)) => Err(PublishError::input(
                "--thumbnail and --thumbnail-at are mutually exclusive",
            )),
            (None, Some(ts)) => Ok(CoverSpec::FrameOffsetMs(parse_timestamp_ms(ts)?)),
            (Some(t), None) if is_url(t) => Ok(CoverSpec::ExternalUrl(t.to_string())),
            (Some(t), None) => Ok(CoverSpec::LocalImage(PathBuf::from(t))),
            (None, None) => Ok(CoverSpec::None),
        }
    }

    pub fn frame_offset_ms(&self) -> Option<u64> {
        match self {
            CoverSpec::FrameOffsetMs(ms) => Some(*ms),
            _ => None,
        }
    }
}

impl fmt::Display for CoverSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverSpec::None => f.write_str("platform default"),
            CoverSpec::FrameOffsetMs(ms) => write!(f, "frame at {ms}ms"),
            CoverSpec::ExternalUrl(url) => f.write_str(url),
            CoverSpec::LocalImage(path) => write!(f, "{}", path.display()),
        }
    }
}

pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// A validated, immutable publish request.
#[derive(Debug, Clone)]
pub struct PublishJob {
    video: PathBuf,
    video_size: u64,
    caption: String,
    cover: CoverSpec,
    platforms: BTreeSet<Platform>,
}

impl PublishJob {
    /// Validate local inputs. Everything that can be rejected without the
    /// network is rejected here.
    pub fn new(
        video: impl Into<PathBuf>,
        caption: impl Into<String>,
        cover: CoverSpec,
        platforms: impl IntoIterator<Item = Platform>,
    ) -> Result<Self> {
        let video = video.into();
        let video_size = file_size(&video, "video")?;
        if video_size == 0 {
            return Err(PublishError::input(format!("video is empty: {}", video.display())));
        }

        let platforms: BTreeSet<Platform> = platforms.into_iter().collect();
        // Instagram fetches the video from the temp host.
        if platforms.contains(&Platform::Instagram) {
            ensure_uploadable(&video)?;
        }

        if let CoverSpec::LocalImage(path) = &cover {
            file_size(path, "cover image")?;
            ensure_uploadable(path)?;
        }

        Ok(Self {
            video,
            video_size,
            caption: caption.into(),
            cover,
            platforms,
        })
    }

    pub fn video(&self) -> &Path {
        &self.video
    }

    pub fn video_size(&self) -> u64 {
        self.video_size
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn cover(&self) -> &CoverSpec {
        &self.cover
    }

    pub fn platforms(&self) -> &BTreeSet<Platform> {
        &self.platforms
    }
}

fn file_size(path: &Path, what: &str) -> Result<u64> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        _ => Err(PublishError::input(format!(
            "{what} not found: {}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn cover_options_are_mutually_exclusive() {
        let err = CoverSpec::from_options(Some("https://x.test/c.jpg"), Some("0:03")).unwrap_err();
        assert!(err.is_input());
    }

    #[test]
    fn cover_options_pick_the_right_mode() {
        assert_eq!(CoverSpec::from_options(None, None).unwrap(), CoverSpec::None);
        assert_eq!(
            CoverSpec::from_options(None, Some("0:03")).unwrap(),
            CoverSpec::FrameOffsetMs(3000)
        );
        assert_eq!(
            CoverSpec::from_options(Some("https://cdn.test/cover.jpg"), None).unwrap(),
            CoverSpec::ExternalUrl("https://cdn.test/cover.jpg".into())
        );
        assert_eq!(
            CoverSpec::from_options(Some("cover.jpg"), None).unwrap(),
            CoverSpec::LocalImage(PathBuf::from("cover.jpg"))
        );
    }

    #[test]
    fn bad_timestamp_is_an_input_error() {
        assert!(CoverSpec::from_options(None, Some("1:2:3:4")).unwrap_err().is_input());
    }

    #[test]
    fn job_requires_existing_video() {
        let dir = tempfile::tempdir().unwrap();
        let err = PublishJob::new(
            dir.path().join("missing.mp4"),
            "caption",
            CoverSpec::None,
            [Platform::Instagram],
        )
        .unwrap_err();
        assert!(err.to_string().contains("video not found"));
    }

    #[test]
    fn job_rejects_empty_video() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("empty.mp4");
        File::create(&video).unwrap();
        let err = PublishJob::new(&video, "caption", CoverSpec::None, [Platform::TikTok]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn job_rejects_oversized_cover_image() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        File::create(&video).unwrap().set_len(1024).unwrap();
        let cover = dir.path().join("cover.png");
        File::create(&cover).unwrap().set_len(600 * 1024 * 1024).unwrap();

        let err = PublishJob::new(&video, "caption", CoverSpec::LocalImage(cover), [Platform::Instagram])
            .unwrap_err();
        assert!(err.is_input());
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn oversized_video_is_rejected_only_for_instagram() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        File::create(&video).unwrap().set_len(600 * 1024 * 1024).unwrap();
        let cover = dir.path().join("cover.jpg");
        File::create(&cover).unwrap().set_len(512).unwrap();

        let err = PublishJob::new(
            &video,
            "caption",
            CoverSpec::LocalImage(cover.clone()),
            [Platform::Instagram, Platform::TikTok],
        )
        .unwrap_err();
        assert!(err.is_input());
        assert!(err.to_string().contains("clip.mp4"));

        // TikTok takes the bytes directly, without the temp host.
        let job = PublishJob::new(&video, "caption", CoverSpec::None, [Platform::TikTok]).unwrap();
        assert_eq!(job.video_size(), 600 * 1024 * 1024);
    }

    #[test]
    fn job_records_video_size_and_platforms() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        File::create(&video).unwrap().set_len(4096).unwrap();

        let job = PublishJob::new(
            &video,
            "Hello world",
            CoverSpec::FrameOffsetMs(3000),
            [Platform::TikTok, Platform::Instagram, Platform::TikTok],
        )
        .unwrap();
        assert_eq!(job.video_size(), 4096);
        assert_eq!(job.caption(), "Hello world");
        assert_eq!(job.cover().frame_offset_ms(), Some(3000));
        assert_eq!(
            job.platforms().iter().copied().collect::<Vec<_>>(),
            vec![Platform::Instagram, Platform::TikTok]
        );
    }
}
