// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

// Image capture for document analysis
//
// Images are shrunk to a fixed width and re-encoded as low-quality JPEG
// before they are base64-encoded into a request, which keeps payloads well
// under the relay's body limit.

use super::types::{InlineData, Part};
use crate::HealaError;
use async_trait::async_trait;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Target width in pixels
pub const TARGET_WIDTH: u32 = 512;
/// JPEG quality (0-100)
pub const JPEG_QUALITY: u8 = 40;
pub const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapturedImage {
    pub uri: String,
    pub base64: String,
    pub mime_type: String,
}

impl CapturedImage {
    /// Decode, downscale and re-encode raw image bytes.
    pub fn from_bytes(uri: impl Into<String>, bytes: &[u8]) -> Result<Self, HealaError> {
        let uri = uri.into();
        let img = image::load_from_memory(bytes)
            .map_err(|e| HealaError::ValidationError(format!("Failed to load image {uri}: {e}")))?;

        let img = downscale(img);

        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
        DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| HealaError::GenericError(format!("Failed to encode image: {e}")))?;

        debug!(
            "Prepared {}: {} -> {} bytes",
            uri,
            bytes.len(),
            buffer.len()
        );

        Ok(Self {
            uri,
            base64: base64::engine::general_purpose::STANDARD.encode(&buffer),
            mime_type: JPEG_MIME.to_string(),
        })
    }

    /// Inline-data part for a generateContent request.
    pub fn to_part(&self) -> Part {
        Part::InlineData {
            inline_data: InlineData {
                data: self.base64.clone(),
                mime_type: self.mime_type.clone(),
            },
        }
    }
}

/// Shrink to `TARGET_WIDTH` keeping the aspect ratio. Narrower images are kept.
fn downscale(img: DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width <= TARGET_WIDTH {
        return img;
    }

    let new_height = ((height as f64) * (TARGET_WIDTH as f64) / (width as f64))
        .round()
        .max(1.0) as u32;
    img.resize_exact(TARGET_WIDTH, new_height, FilterType::Triangle)
}

/// Where the workflow gets its image from.
///
/// `Ok(None)` means the user backed out without choosing anything.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn pick(&self) -> Result<Option<CapturedImage>, HealaError>;
}

/// Reads an image from the local filesystem.
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    async fn pick(&self) -> Result<Option<CapturedImage>, HealaError> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| read_error(&self.path, e))?;

        info!("Loaded {} ({} bytes)", self.path.display(), data.len());

        let uri = self.path.display().to_string();
        let image = tokio::task::spawn_blocking(move || CapturedImage::from_bytes(uri, &data))
            .await
            .map_err(|e| HealaError::GenericError(format!("Image task failed: {e}")))??;

        Ok(Some(image))
    }
}

/// Unreadable because of access rights is a permission problem; anything
/// else means the path does not hold a usable image.
fn read_error(path: &Path, e: std::io::Error) -> HealaError {
    match e.kind() {
        ErrorKind::PermissionDenied => {
            HealaError::PermissionDenied(format!("Cannot read {}: {e}", path.display()))
        }
        _ => HealaError::ValidationError(format!(
            "Failed to read image {}: {e}",
            path.display()
        )),
    }
}
