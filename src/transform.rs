//! Image processing for captured screenshots.
//!
//! Browsers do not always render exactly the requested window height, so a
//! capture is first cropped back to the window's aspect ratio and then
//! resized to the thumbnail size.

use crate::{OutputFormat, TransformError, WindowSize};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use tracing::debug;

/// Crop and resize raw captured bytes into an encoded thumbnail.
///
/// # Arguments
///
/// * `img_bytes` - Encoded image as returned by the driver.
/// * `window_size` - Window the capture was requested at.
/// * `thumb_size` - Exact size of the produced thumbnail.
/// * `output` - Encoding of the produced thumbnail.
/// * `crop` - Normalize the capture to the window's aspect ratio first.
///
/// # Errors
///
/// Returns an error if the bytes cannot be decoded, the thumbnail size is
/// zero or above [`WindowSize::MAX_DIMENSION`], or the encoder rejects the
/// image.
pub fn resize_image(
    img_bytes: &[u8],
    window_size: WindowSize,
    thumb_size: WindowSize,
    output: OutputFormat,
    crop: bool,
) -> Result<Vec<u8>, TransformError> {
    if thumb_size.is_degenerate() {
        return Err(TransformError::DegenerateSize(thumb_size));
    }
    if thumb_size.is_oversized() {
        return Err(TransformError::OversizedSize(thumb_size));
    }

    let mut img =
        image::load_from_memory(img_bytes).map_err(|e| TransformError::Decode(e.to_string()))?;
    let (width, height) = img.dimensions();
    debug!("Captured image size: {}x{}", width, height);

    if crop && height != window_size.height {
        img = crop_to_window(&img, window_size)?;
    }

    debug!("Resizing to {}", thumb_size);
    let mut resized = img.resize_exact(thumb_size.width, thumb_size.height, FilterType::Lanczos3);

    // Lossy encoders reject an alpha channel
    if output != OutputFormat::Png {
        resized = DynamicImage::ImageRgb8(resized.to_rgb8());
    }

    let mut encoded = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut encoded), output.image_format())
        .map_err(|e| TransformError::Encode(e.to_string()))?;

    Ok(encoded)
}

/// Crop `img` from the top-left corner so that its height matches the
/// window's height/width ratio applied to the captured width.
///
/// The crop never extends past the captured image.
pub fn crop_to_window(
    img: &DynamicImage,
    window_size: WindowSize,
) -> Result<DynamicImage, TransformError> {
    if window_size.is_degenerate() {
        return Err(TransformError::DegenerateSize(window_size));
    }

    let (width, height) = img.dimensions();
    let desired_ratio = f64::from(window_size.height) / f64::from(window_size.width);
    let desired_height = ((f64::from(width) * desired_ratio) as u32).min(height);

    if desired_height == 0 {
        return Err(TransformError::EmptyCrop { width, height });
    }

    debug!("Cropping to: {}x{}", width, desired_height);
    Ok(img.crop_imm(0, 0, width, desired_height))
}
