//! Image header sniffing
//!
//! Only headers are read: enough to learn the real format and dimensions of
//! an embedded or external image. PNG, JPEG and WebP go through the `image`
//! crate's decoders; KTX2 has a fixed header that is read directly.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

/// KTX2 file identifier
const KTX2_IDENTIFIER: [u8; 12] = [0xAB, 0x4B, 0x54, 0x58, 0x20, 0x32, 0x30, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A];

/// Identifier, vkFormat, typeSize, pixelWidth, pixelHeight
const KTX2_HEADER_LENGTH: usize = 28;

/// Format and size of an image payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SniffError {
    #[error("image format not recognized")]
    Unrecognized,
    /// Format recognized but the header could not be read to the end
    #[error("unexpected end of image stream")]
    Truncated,
}

fn mime_type_of(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn sniff_ktx2(data: &[u8]) -> Result<ImageInfo, SniffError> {
    if data.len() < KTX2_HEADER_LENGTH {
        return Err(SniffError::Truncated);
    }
    Ok(ImageInfo {
        mime_type: "image/ktx2",
        width: read_u32_le(data, 20),
        height: read_u32_le(data, 24).max(1),
    })
}

/// Identify an image from its leading bytes
pub fn sniff(data: &[u8]) -> Result<ImageInfo, SniffError> {
    if data.starts_with(&KTX2_IDENTIFIER) {
        return sniff_ktx2(data);
    }

    let format = image::guess_format(data).map_err(|_| SniffError::Unrecognized)?;
    let mime_type = mime_type_of(format).ok_or(SniffError::Unrecognized)?;

    let (width, height) = ImageReader::with_format(Cursor::new(data), format)
        .into_dimensions()
        .map_err(|err| {
            tracing::trace!("Image header unreadable ({}): {}", mime_type, err);
            SniffError::Truncated
        })?;

    Ok(ImageInfo {
        mime_type,
        width,
        height,
    })
}
