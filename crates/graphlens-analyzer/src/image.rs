//! Input validation and fingerprinting for submitted chart images.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::AnalyzeError;

/// Image encodings accepted for analysis, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
}

impl ImageFormat {
    /// Detect the encoding from the leading bytes. Returns `None` for
    /// anything outside the allow-list.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.starts_with(b"BM") && bytes.len() >= 14 {
            Some(Self::Bmp)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Webp => "image/webp",
        }
    }
}

/// A chart image that passed validation, borrowed from the request body.
#[derive(Debug, Clone)]
pub struct ChartImage<'a> {
    bytes: &'a [u8],
    format: ImageFormat,
    source_hash: String,
}

impl<'a> ChartImage<'a> {
    /// Check size and encoding, then fingerprint the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Validation`] if the image is empty, larger
    /// than `max_bytes`, or not one of the accepted encodings.
    pub fn validate(bytes: &'a [u8], max_bytes: usize) -> Result<Self, AnalyzeError> {
        if bytes.is_empty() {
            return Err(AnalyzeError::Validation("image is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(AnalyzeError::Validation(format!(
                "image is {} bytes; the maximum accepted size is {max_bytes} bytes",
                bytes.len()
            )));
        }
        let format = ImageFormat::sniff(bytes).ok_or_else(|| {
            AnalyzeError::Validation(
                "unsupported image type; expected PNG, JPEG, GIF, BMP or WEBP".to_string(),
            )
        })?;

        Ok(Self {
            bytes,
            format,
            source_hash: fingerprint(bytes),
        })
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.bytes
    }

    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// SHA-256 hex fingerprint of the image bytes.
    #[must_use]
    pub fn source_hash(&self) -> &str {
        &self.source_hash
    }
}

/// Lower-case hex SHA-256 of `bytes`.
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
