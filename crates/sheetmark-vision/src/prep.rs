// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet preprocessing — input validation, resize to the canonical size,
// grayscale conversion, inverted binarisation, and speck removal. Produces the
// binary image that boundary detection and bubble scoring operate on.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::median_filter;
use sheetmark_core::config::PreprocessConfig;
use sheetmark_core::error::{Result, SheetmarkError};
use tracing::{debug, instrument};

/// Ink value in binary images.
pub const INK: u8 = 255;
/// Paper value in binary images.
pub const PAPER: u8 = 0;

/// Reject anything that is not a non-empty 3-channel raster.
pub fn validate_input(image: &DynamicImage) -> Result<()> {
    let channels = image.color().channel_count();
    if channels != 3 {
        return Err(SheetmarkError::MalformedInput(format!(
            "expected a 3-channel color image, got {:?} ({} channels)",
            image.color(),
            channels
        )));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(SheetmarkError::MalformedInput(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Run the full preprocessing chain:
///
/// 1. Validate the input (3 channels, non-empty)
/// 2. Resize exactly to `width` x `height`
/// 3. Convert to grayscale
/// 4. Inverted binary threshold (ink becomes foreground)
/// 5. Median-filter denoising
#[instrument(skip(image, config), fields(src_w = image.width(), src_h = image.height()))]
pub fn preprocess(
    image: &DynamicImage,
    config: &PreprocessConfig,
    width: u32,
    height: u32,
) -> Result<GrayImage> {
    validate_input(image)?;

    let gray = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_luma8();
    debug!(width, height, "Resized and converted to grayscale");

    let binary = binarize_inverted(&gray, config.binary_threshold);
    let denoised = denoise(&binary, config.denoise_radius);
    debug!(
        threshold = config.binary_threshold,
        radius = config.denoise_radius,
        "Binarised and denoised"
    );
    Ok(denoised)
}

/// Inverted global threshold: values above `threshold` become [`PAPER`],
/// everything else [`INK`].
pub fn binarize_inverted(gray: &GrayImage, threshold: u8) -> GrayImage {
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0];
        Luma([if value > threshold { PAPER } else { INK }])
    })
}

/// Median filter with a square window of `radius`. A radius of 0 returns a
/// copy of the input.
pub fn denoise(binary: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return binary.clone();
    }
    median_filter(binary, radius, radius)
}
