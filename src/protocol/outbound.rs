//! Host → editor messages.

use serde::Serialize;
use serde_json::Value;

use crate::edit::{EditContext, EncodedFormat};

pub const MAKAPIX_INIT: &str = "MAKAPIX_INIT";
pub const MAKAPIX_AUTH_REFRESHED: &str = "MAKAPIX_AUTH_REFRESHED";
pub const MAKAPIX_EDIT_FRAMES_RGBA: &str = "MAKAPIX_EDIT_FRAMES_RGBA";
pub const MAKAPIX_EDIT_WEBP: &str = "MAKAPIX_EDIT_WEBP";
pub const MAKAPIX_EDIT_PNG: &str = "MAKAPIX_EDIT_PNG";
pub const MAKAPIX_EDIT_GIF: &str = "MAKAPIX_EDIT_GIF";
pub const MAKAPIX_EDIT_BMP: &str = "MAKAPIX_EDIT_BMP";

/// Messages posted into the editor frame.
///
/// Payload variants own their buffers; posting one moves them into the port,
/// which hands them to the platform as transferables. Buffers are skipped by
/// serde and surface through [`OutboundMessage::into_parts`].
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "MAKAPIX_INIT", rename_all = "camelCase")]
    Init {
        access_token: String,
        user_sqid: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        edit_mode: Option<EditContext>,
    },

    #[serde(rename = "MAKAPIX_AUTH_REFRESHED", rename_all = "camelCase")]
    AuthRefreshed { access_token: String },

    #[serde(rename = "MAKAPIX_EDIT_FRAMES_RGBA", rename_all = "camelCase")]
    EditFramesRgba {
        post_sqid: String,
        width: u32,
        height: u32,
        fps: u32,
        frame_durations_ms: Vec<u32>,
        #[serde(skip)]
        frame_rgba_buffers: Vec<Vec<u8>>,
    },

    #[serde(rename = "MAKAPIX_EDIT_WEBP", rename_all = "camelCase")]
    EditWebp {
        post_sqid: String,
        #[serde(skip)]
        webp_data: Vec<u8>,
        webp_data_size: usize,
    },

    #[serde(rename = "MAKAPIX_EDIT_PNG", rename_all = "camelCase")]
    EditPng {
        post_sqid: String,
        #[serde(skip)]
        png_data: Vec<u8>,
        png_data_size: usize,
    },

    #[serde(rename = "MAKAPIX_EDIT_GIF", rename_all = "camelCase")]
    EditGif {
        post_sqid: String,
        #[serde(skip)]
        gif_data: Vec<u8>,
        gif_data_size: usize,
    },

    #[serde(rename = "MAKAPIX_EDIT_BMP", rename_all = "camelCase")]
    EditBmp {
        post_sqid: String,
        #[serde(skip)]
        bmp_data: Vec<u8>,
        bmp_data_size: usize,
    },
}

/// Buffers to attach to a serialized message and list as transferables.
#[derive(Debug, PartialEq, Eq)]
pub enum Transfer {
    None,
    /// One buffer stored under `field`.
    Single { field: &'static str, buffer: Vec<u8> },
    /// An ordered list of buffers stored as an array under `field`.
    List {
        field: &'static str,
        buffers: Vec<Vec<u8>>,
    },
}

impl Transfer {
    pub fn total_bytes(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single { buffer, .. } => buffer.len(),
            Self::List { buffers, .. } => buffers.iter().map(Vec::len).sum(),
        }
    }
}

impl OutboundMessage {
    /// Single-buffer payload message for an encoded format.
    pub fn edit_encoded(format: EncodedFormat, post_sqid: String, data: Vec<u8>) -> Self {
        let size = data.len();
        match format {
            EncodedFormat::Webp => Self::EditWebp {
                post_sqid,
                webp_data: data,
                webp_data_size: size,
            },
            EncodedFormat::Png => Self::EditPng {
                post_sqid,
                png_data: data,
                png_data_size: size,
            },
            EncodedFormat::Gif => Self::EditGif {
                post_sqid,
                gif_data: data,
                gif_data_size: size,
            },
            EncodedFormat::Bmp => Self::EditBmp {
                post_sqid,
                bmp_data: data,
                bmp_data_size: size,
            },
        }
    }

    /// The `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => MAKAPIX_INIT,
            Self::AuthRefreshed { .. } => MAKAPIX_AUTH_REFRESHED,
            Self::EditFramesRgba { .. } => MAKAPIX_EDIT_FRAMES_RGBA,
            Self::EditWebp { .. } => MAKAPIX_EDIT_WEBP,
            Self::EditPng { .. } => MAKAPIX_EDIT_PNG,
            Self::EditGif { .. } => MAKAPIX_EDIT_GIF,
            Self::EditBmp { .. } => MAKAPIX_EDIT_BMP,
        }
    }

    pub fn is_payload(&self) -> bool {
        !matches!(self, Self::Init { .. } | Self::AuthRefreshed { .. })
    }

    /// Split into the JSON body and the buffers that travel as transferables.
    pub fn into_parts(self) -> Result<(Value, Transfer), serde_json::Error> {
        let body = serde_json::to_value(&self)?;
        let transfer = match self {
            Self::Init { .. } | Self::AuthRefreshed { .. } => Transfer::None,
            Self::EditFramesRgba {
                frame_rgba_buffers, ..
            } => Transfer::List {
                field: "frameRgbaBuffers",
                buffers: frame_rgba_buffers,
            },
            Self::EditWebp { webp_data, .. } => Transfer::Single {
                field: "webpData",
                buffer: webp_data,
            },
            Self::EditPng { png_data, .. } => Transfer::Single {
                field: "pngData",
                buffer: png_data,
            },
            Self::EditGif { gif_data, .. } => Transfer::Single {
                field: "gifData",
                buffer: gif_data,
            },
            Self::EditBmp { bmp_data, .. } => Transfer::Single {
                field: "bmpData",
                buffer: bmp_data,
            },
        };
        Ok((body, transfer))
    }
}
