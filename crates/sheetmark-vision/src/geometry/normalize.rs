// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometric normalisation — locate the answer-grid boundary in a binary sheet
// image and rectify it to the canonical rectangle.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use sheetmark_core::config::BoundaryConfig;
use sheetmark_core::error::{Result, SheetmarkError};
use tracing::{debug, info, instrument, warn};

use super::contours::{external_contours, quad_candidates};
use super::corners::CornerSet;

/// Outcome of boundary detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryDetection {
    /// A qualifying quadrilateral was found; corners are canonical.
    Found(CornerSet),
    /// No contour qualified; the image is used as-is.
    NotFound,
}

impl BoundaryDetection {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn corners(&self) -> Option<&CornerSet> {
        match self {
            Self::Found(corners) => Some(corners),
            Self::NotFound => None,
        }
    }
}

/// A rectified (or passed-through) sheet image.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub image: GrayImage,
    pub boundary: BoundaryDetection,
}

/// Finds the sheet boundary and warps it to the canonical rectangle.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: BoundaryConfig,
}

impl Normalizer {
    pub fn new(config: BoundaryConfig) -> Self {
        Self { config }
    }

    /// Locate the sheet boundary.
    ///
    /// The first qualifying quadrilateral in contour traversal order wins,
    /// even when a larger one exists further on.
    #[instrument(skip_all, fields(width = binary.width(), height = binary.height()))]
    pub fn detect_boundary(&self, binary: &GrayImage) -> Result<BoundaryDetection> {
        let contours = external_contours(binary);
        let candidates = quad_candidates(&contours, &self.config);
        debug!(
            contours = contours.len(),
            candidates = candidates.len(),
            "Rectangular candidates filtered"
        );

        let Some(first) = candidates.first() else {
            return Ok(BoundaryDetection::NotFound);
        };
        if candidates.len() > 1 {
            debug!(
                chosen_area = first.area,
                largest_area = candidates.iter().map(|c| c.area).fold(0.0, f64::max),
                "Several rectangles qualify; using the first one traced"
            );
        }

        let corners = CornerSet::from_vertices(&first.vertices)?;
        debug!(
            top_left = ?corners.top_left,
            top_right = ?corners.top_right,
            bottom_left = ?corners.bottom_left,
            bottom_right = ?corners.bottom_right,
            "Sheet boundary located"
        );
        Ok(BoundaryDetection::Found(corners))
    }

    /// Rectify `binary` to `width` x `height`.
    ///
    /// When no boundary is found the input is returned unchanged, tagged
    /// [`BoundaryDetection::NotFound`].
    #[instrument(skip(self, binary), fields(src_w = binary.width(), src_h = binary.height()))]
    pub fn normalize(&self, binary: &GrayImage, width: u32, height: u32) -> Result<Normalized> {
        let boundary = self.detect_boundary(binary)?;
        match boundary {
            BoundaryDetection::Found(corners) => {
                let image = warp_to_rectangle(binary, &corners, width, height)?;
                info!(width, height, "Perspective correction applied");
                Ok(Normalized { image, boundary })
            }
            BoundaryDetection::NotFound => {
                warn!("No rectangular sheet boundary found; using the image unrectified");
                Ok(Normalized {
                    image: binary.clone(),
                    boundary,
                })
            }
        }
    }
}

/// Warp the quadrilateral `corners` of `image` onto a `width` x `height`
/// axis-aligned rectangle. Samples falling outside the source are 0.
pub fn warp_to_rectangle(
    image: &GrayImage,
    corners: &CornerSet,
    width: u32,
    height: u32,
) -> Result<GrayImage> {
    let (w, h) = (width as f32, height as f32);
    let dest: [(f32, f32); 4] = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];

    let projection = Projection::from_control_points(corners.to_array(), dest).ok_or_else(|| {
        SheetmarkError::Geometry(format!(
            "no projective transform maps {corners:?} onto a {width}x{height} rectangle"
        ))
    })?;

    let mut output = GrayImage::new(width, height);
    warp_into(image, &projection, Interpolation::Bilinear, Luma([0u8]), &mut output);
    Ok(output)
}
