//! Attached media, polymorphic over the upstream `type` discriminator.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::raw::{count_at, path, str_at};

/// A media attachment on a tweet.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    /// Numeric id as a string
    pub id: String,
    /// Direct URL of the image (or video thumbnail)
    pub media_url: String,
    /// Shortened t.co URL as it appears in the tweet text
    pub display_url: String,
    pub expanded_url: Option<String>,
    /// Native width in pixels, from `original_info`
    pub width: Option<u64>,
    /// Native height in pixels, from `original_info`
    pub height: Option<u64>,
    pub kind: MediaKind,
}

/// Media variants as discriminated upstream.
///
/// Unrecognized discriminators hydrate as [`MediaKind::Other`] rather than
/// failing, so a new upstream media type does not break timeline parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaKind {
    Photo,
    Video(VideoInfo),
    AnimatedGif(VideoInfo),
    Other(String),
}

/// Playback details for video-like media.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoInfo {
    pub duration_ms: u64,
    pub variants: Vec<VideoVariant>,
}

/// One encoding of a video, ordered by the platform from low to high bitrate.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoVariant {
    pub content_type: String,
    pub url: String,
    pub bitrate: Option<u64>,
}

impl Media {
    pub(crate) fn from_value(value: &Value) -> Result<Self> {
        let id = str_at(value, &["id_str"])
            .map(str::to_string)
            .ok_or_else(|| Error::malformed("media", "missing id_str"))?;

        let kind = match str_at(value, &["type"]).unwrap_or("") {
            "photo" => MediaKind::Photo,
            "video" => MediaKind::Video(video_info(value)),
            "animated_gif" => MediaKind::AnimatedGif(video_info(value)),
            other => MediaKind::Other(other.to_string()),
        };

        Ok(Self {
            id,
            media_url: str_at(value, &["media_url_https"]).unwrap_or_default().to_string(),
            display_url: str_at(value, &["display_url"]).unwrap_or_default().to_string(),
            expanded_url: str_at(value, &["expanded_url"]).map(str::to_string),
            width: path(value, &["original_info", "width"]).and_then(Value::as_u64),
            height: path(value, &["original_info", "height"]).and_then(Value::as_u64),
            kind,
        })
    }

    /// Playback info for video-like media.
    pub fn video_info(&self) -> Option<&VideoInfo> {
        match &self.kind {
            MediaKind::Video(info) | MediaKind::AnimatedGif(info) => Some(info),
            _ => None,
        }
    }

    /// The highest-bitrate video variant, when this is video-like media.
    pub fn best_variant(&self) -> Option<&VideoVariant> {
        self.video_info()?
            .variants
            .iter()
            .max_by_key(|v| v.bitrate.unwrap_or(0))
    }
}

fn video_info(value: &Value) -> VideoInfo {
    let info = path(value, &["video_info"]);
    let variants = info
        .and_then(|i| i.get("variants"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| {
                    Some(VideoVariant {
                        content_type: str_at(v, &["content_type"])?.to_string(),
                        url: str_at(v, &["url"])?.to_string(),
                        bitrate: v.get("bitrate").and_then(Value::as_u64),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    VideoInfo {
        duration_ms: info.map(|i| count_at(i, &["duration_millis"])).unwrap_or(0),
        variants,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn photo_hydrates_with_dimensions() {
        let media = Media::from_value(&json!({
            "id_str": "1",
            "type": "photo",
            "media_url_https": "https://pbs.twimg.com/media/x.jpg",
            "display_url": "pic.twitter.com/abc",
            "original_info": {"width": 1920, "height": 1080}
        }))
        .unwrap();
        assert_eq!(media.kind, MediaKind::Photo);
        assert_eq!(media.width, Some(1920));
        assert_eq!(media.height, Some(1080));
        assert!(media.video_info().is_none());
    }

    #[test]
    fn missing_dimensions_degrade_to_none() {
        let media = Media::from_value(&json!({"id_str": "4", "type": "photo"})).unwrap();
        assert_eq!(media.width, None);
        assert_eq!(media.height, None);
    }

    #[test]
    fn video_variants_hydrate_and_rank() {
        let media = Media::from_value(&json!({
            "id_str": "2",
            "type": "video",
            "video_info": {
                "duration_millis": 9500,
                "variants": [
                    {"content_type": "application/x-mpegURL", "url": "https://v/pl.m3u8"},
                    {"content_type": "video/mp4", "bitrate": 832000, "url": "https://v/mid.mp4"},
                    {"content_type": "video/mp4", "bitrate": 2176000, "url": "https://v/hi.mp4"}
                ]
            }
        }))
        .unwrap();
        assert_eq!(media.video_info().unwrap().duration_ms, 9500);
        assert_eq!(media.best_variant().unwrap().url, "https://v/hi.mp4");
    }

    #[test]
    fn unknown_type_degrades_to_other() {
        let media =
            Media::from_value(&json!({"id_str": "3", "type": "hologram"})).unwrap();
        assert_eq!(media.kind, MediaKind::Other("hologram".into()));
    }

    #[test]
    fn missing_id_is_malformed() {
        assert!(Media::from_value(&json!({"type": "photo"})).is_err());
    }
}
