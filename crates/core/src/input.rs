//! Detection of the uploaded file's type.
//!
//! Magic bytes decide first; the file name's extension is only consulted when
//! the content is not recognized.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Input file is empty")]
    Empty,
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Tiff,
    Bmp,
    WebP,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Png => write!(f, "png"),
            ImageKind::Jpeg => write!(f, "jpeg"),
            ImageKind::Gif => write!(f, "gif"),
            ImageKind::Tiff => write!(f, "tiff"),
            ImageKind::Bmp => write!(f, "bmp"),
            ImageKind::WebP => write!(f, "webp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "format")]
pub enum InputKind {
    Pdf,
    Image(ImageKind),
}

impl InputKind {
    pub fn is_pdf(&self) -> bool {
        matches!(self, InputKind::Pdf)
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Pdf => write!(f, "pdf"),
            InputKind::Image(kind) => write!(f, "{kind} image"),
        }
    }
}

fn from_magic(bytes: &[u8]) -> Option<InputKind> {
    // PDF headers may be preceded by junk; readers accept it within 1 KiB.
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        return Some(InputKind::Pdf);
    }

    let image = if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        ImageKind::Png
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageKind::Jpeg
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        ImageKind::Gif
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        ImageKind::Tiff
    } else if bytes.starts_with(b"BM") && bytes.len() >= 14 {
        ImageKind::Bmp
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        ImageKind::WebP
    } else {
        return None;
    };

    Some(InputKind::Image(image))
}

fn from_extension(file_name: &str) -> Option<InputKind> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let kind = match ext.to_ascii_lowercase().as_str() {
        "pdf" => InputKind::Pdf,
        "png" => InputKind::Image(ImageKind::Png),
        "jpg" | "jpeg" => InputKind::Image(ImageKind::Jpeg),
        "gif" => InputKind::Image(ImageKind::Gif),
        "tif" | "tiff" => InputKind::Image(ImageKind::Tiff),
        "bmp" => InputKind::Image(ImageKind::Bmp),
        "webp" => InputKind::Image(ImageKind::WebP),
        _ => return None,
    };
    Some(kind)
}

/// Decide whether `bytes` is a PDF or one of the supported image formats.
pub fn sniff(bytes: &[u8], file_name: &str) -> Result<InputKind, InputError> {
    if bytes.is_empty() {
        return Err(InputError::Empty);
    }

    from_magic(bytes)
        .or_else(|| from_extension(file_name))
        .ok_or_else(|| InputError::Unsupported(file_name.to_string()))
}
