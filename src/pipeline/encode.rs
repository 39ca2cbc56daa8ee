//! Image encoding: rendered pages → base64 PNG `ImageData` attachments.
//!
//! PNG keeps small print (NDC codes, lot numbers, DEA numbers) crisp where
//! JPEG artefacts would blur digits. `detail: "high"` asks GPT-4-class
//! models to tile the image instead of downscaling it to one overview tile.

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode one image as a base64 PNG.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(STANDARD.encode(&buf))
}

/// Encode every rendered page as a high-detail PNG attachment.
pub fn encode_pages(images: &[DynamicImage]) -> Result<Vec<ImageData>, ExtractError> {
    images
        .iter()
        .enumerate()
        .map(|(idx, img)| {
            let b64 = encode_png_base64(img).map_err(|e| ExtractError::RasterisationFailed {
                page: idx + 1,
                detail: format!("Image encoding failed: {}", e),
            })?;
            debug!("Page {}: {} bytes base64", idx + 1, b64.len());
            Ok(ImageData::new(b64, "image/png").with_detail("high"))
        })
        .collect()
}
