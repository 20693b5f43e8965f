//! crates/skincheck_core/src/image_source.rs
//!
//! Normalizes both image origins (a frozen camera frame or an uploaded file)
//! into one `CapturedImage`, so nothing downstream cares where it came from.

use bytes::Bytes;
use chrono::Utc;
use image::ImageReader;
use std::io::Cursor;
use tracing::debug;
use uuid::Uuid;

use crate::capture::EncodedFrame;
use crate::domain::{CapturedImage, ImageDimensions, ImageOrigin};
use crate::error::ImageError;

/// Default cap on uploaded image size.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// A file chosen by the user, as received from the picker or a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageSource {
    max_bytes: usize,
}

impl Default for ImageSource {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ImageSource {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn from_capture(&self, frame: EncodedFrame) -> CapturedImage {
        CapturedImage {
            id: Uuid::new_v4(),
            bytes: Bytes::from(frame.jpeg),
            content_type: "image/jpeg".to_string(),
            dimensions: Some(ImageDimensions {
                width: frame.width,
                height: frame.height,
            }),
            origin: ImageOrigin::Capture,
            created_at: Utc::now(),
        }
    }

    /// Accepts any `image/*` file up to the size cap. Dimensions are probed
    /// from the header when the format is recognised and left unknown otherwise.
    pub fn from_file(&self, file: UploadedFile) -> Result<CapturedImage, ImageError> {
        let content_type = resolve_content_type(&file)?;
        if file.bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if file.bytes.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                size: file.bytes.len(),
                limit: self.max_bytes,
            });
        }

        let dimensions = probe_dimensions(&file.bytes);
        debug!(
            "Accepted upload {:?} ({}, {} bytes, {:?})",
            file.file_name,
            content_type,
            file.bytes.len(),
            dimensions
        );

        Ok(CapturedImage {
            id: Uuid::new_v4(),
            bytes: file.bytes,
            content_type,
            dimensions,
            origin: ImageOrigin::Upload,
            created_at: Utc::now(),
        })
    }
}

/// Uses the declared MIME type, falling back to the file extension.
fn resolve_content_type(file: &UploadedFile) -> Result<String, ImageError> {
    let declared = file
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    let content_type = match declared {
        Some(ct) => ct,
        None => file
            .file_name
            .as_deref()
            .and_then(mime_from_extension)
            .unwrap_or("application/octet-stream")
            .to_string(),
    };

    if content_type.starts_with("image/") {
        Ok(content_type)
    } else {
        Err(ImageError::UnsupportedType(content_type))
    }
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

fn probe_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(ImageDimensions { width, height })
}
