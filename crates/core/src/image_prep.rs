//! Downscaling of reference images before they are inlined into requests.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;

use crate::types::image::DataUri;

/// Widest reference image sent to the provider.
pub const MAX_REFERENCE_WIDTH: u32 = 1024;
/// JPEG quality for re-encoded references.
pub const REFERENCE_JPEG_QUALITY: u8 = 70;

/// Shrink `uri` to at most `MAX_REFERENCE_WIDTH` pixels wide and re-encode
/// it as JPEG.
///
/// Non-image or undecodable input is returned unchanged; the provider will
/// either accept it or reject the request with a classified error.
pub fn prepare_reference(uri: &DataUri) -> DataUri {
    if !uri.is_image() {
        return uri.clone();
    }
    match downscale(uri, MAX_REFERENCE_WIDTH, REFERENCE_JPEG_QUALITY) {
        Ok(prepared) => {
            tracing::debug!(
                target: "storyboard::image_prep",
                before = uri.encoded_len(),
                after = prepared.encoded_len(),
                "reference image re-encoded"
            );
            prepared
        }
        Err(err) => {
            tracing::warn!(target: "storyboard::image_prep", error = %err, "image compression failed, using original");
            uri.clone()
        }
    }
}

fn downscale(uri: &DataUri, max_width: u32, quality: u8) -> Result<DataUri, String> {
    let bytes = uri.to_bytes().map_err(|e| e.to_string())?;
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .decode()
        .map_err(|e| e.to_string())?;

    let img = if img.width() > max_width {
        let height = ((u64::from(max_width) * u64::from(img.height())) / u64::from(img.width()))
            .max(1) as u32;
        img.resize_exact(max_width, height, FilterType::Triangle)
    } else {
        img
    };

    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&rgb)
        .map_err(|e| e.to_string())?;
    Ok(DataUri::from_bytes("image/jpeg", &out))
}
