use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use bytes::Bytes;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Standard alphabet, padding optional. ASCII whitespace is stripped before decoding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How a rendered file is presented in the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Download,
}

impl MediaKind {
    /// Pick a presentation from a lowercase extension.
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            Some("mp4" | "webm") => Self::Video,
            Some("gif" | "png" | "svg") => Self::Image,
            _ => Self::Download,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
            Self::Download => "download",
        }
    }
}

/// Decoded render output ready to be handed to a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub mime: &'static str,
    pub bytes: Bytes,
}

impl MediaBlob {
    pub fn from_base64(payload: &str, mime: &'static str) -> Result<Self, base64::DecodeError> {
        let compact: Vec<u8> = payload
            .bytes()
            .filter(|byte| !byte.is_ascii_whitespace())
            .collect();
        let bytes = PAYLOAD_ENGINE.decode(compact)?;
        Ok(Self {
            mime,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Standard base64 of the blob contents, used for `data:` URLs.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Lowercase text after the final `.` of `filename`, if there is one.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    (!extension.is_empty()).then(|| extension.to_ascii_lowercase())
}

/// MIME type for a known media extension (case-insensitive).
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "gif" => Some("image/gif"),
        "png" => Some("image/png"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Inverse of [`mime_for_extension`], falling back to `bin`.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "image/gif" => "gif",
        "image/png" => "png",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

/// Resolve the blob MIME type from the response extension, or from the
/// requested format when the filename has no extension. Anything unrecognised
/// is `application/octet-stream`.
pub fn resolve_mime(extension: Option<&str>, requested_format: &str) -> &'static str {
    mime_for_extension(extension.unwrap_or(requested_format)).unwrap_or(OCTET_STREAM)
}
