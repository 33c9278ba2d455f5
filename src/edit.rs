//! What is being edited: artwork formats and the edit context sent with INIT.

use serde::{Deserialize, Serialize};

use crate::service::Post;

/// Frame rate used when an animation carries no usable durations.
pub const DEFAULT_FPS: u32 = 10;

const MAX_FPS: u32 = 60;

/// Declared artwork format. Closed set; anything else is unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtworkFormat {
    Png,
    Gif,
    Webp,
    WebpAnimated,
    Bmp,
}

impl ArtworkFormat {
    /// Parse a declared format name (`png`, `webp-animated`, ...). Also accepts
    /// bare MIME types and file extensions as the backend reports them.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = name.strip_prefix("image/").unwrap_or(&name);
        let name = name.strip_prefix('.').unwrap_or(name);
        match name {
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "webp-animated" => Some(Self::WebpAnimated),
            "bmp" | "x-ms-bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Derive the format of a post's artwork. `file_format` wins over the
    /// MIME type; a WebP with more than one frame is animated.
    pub fn detect(file_format: Option<&str>, mime_type: &str, frame_count: Option<u32>) -> Option<Self> {
        let base = file_format
            .and_then(Self::parse)
            .or_else(|| Self::parse(mime_type))?;
        match base {
            Self::Webp if frame_count.unwrap_or(1) > 1 => Some(Self::WebpAnimated),
            other => Some(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::WebpAnimated => "webp-animated",
            Self::Bmp => "bmp",
        }
    }

    /// The encoded container the bytes are in.
    pub fn encoded(&self) -> EncodedFormat {
        match self {
            Self::Png => EncodedFormat::Png,
            Self::Gif => EncodedFormat::Gif,
            Self::Webp | Self::WebpAnimated => EncodedFormat::Webp,
            Self::Bmp => EncodedFormat::Bmp,
        }
    }
}

/// Formats that can be transferred as a single encoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodedFormat {
    Png,
    Gif,
    Webp,
    Bmp,
}

impl EncodedFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
        }
    }
}

/// Describes the existing artwork an editor session opens. Sent to the editor
/// as `editMode` inside `MAKAPIX_INIT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditContext {
    pub post_sqid: String,
    pub artwork_source_url: String,
    pub title: String,
    pub declared_format: ArtworkFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_durations_ms: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
}

impl EditContext {
    /// Context for a post whose format is already known.
    pub fn for_post(post: &Post, declared_format: ArtworkFormat) -> Self {
        Self {
            post_sqid: post.public_sqid.clone(),
            artwork_source_url: post.art_url.clone(),
            title: post.title.clone(),
            declared_format,
            frame_count: post.frame_count,
            width: post.width,
            height: post.height,
            frame_durations_ms: None,
            fps: None,
        }
    }

    pub fn is_animated(&self) -> bool {
        self.declared_format == ArtworkFormat::WebpAnimated
    }
}

/// Integer frame rate from per-frame durations (mean duration, clamped to 1..=60).
pub fn fps_from_durations(durations_ms: &[u32]) -> u32 {
    let total: u64 = durations_ms.iter().map(|&d| u64::from(d)).sum();
    if durations_ms.is_empty() || total == 0 {
        return DEFAULT_FPS;
    }
    let mean = total as f64 / durations_ms.len() as f64;
    ((1000.0 / mean).round() as u32).clamp(1, MAX_FPS)
}
