// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bubble scoring — ink coverage per cell.

use image::GrayImage;
use sheetmark_core::error::{Result, SheetmarkError};
use sheetmark_core::types::FillVector;
use tracing::debug;

use super::segment::Cell;

/// Number of non-zero pixels in a binary cell.
pub fn fill_score(cell: &GrayImage) -> f32 {
    cell.pixels().filter(|pixel| pixel.0[0] != 0).count() as f32
}

/// Build the fill matrix for cells in segmenter order.
///
/// Cell `i` lands in row `i / choice_count`, column `i % choice_count`.
/// Missing trailing cells leave zeros; more cells than slots is an error.
pub fn score(cells: &[Cell], question_count: usize, choice_count: usize) -> Result<FillVector> {
    score_images(cells.iter().map(|cell| &cell.image), question_count, choice_count)
}

/// [`score`] over bare cell images.
pub fn score_images<'a>(
    images: impl ExactSizeIterator<Item = &'a GrayImage>,
    question_count: usize,
    choice_count: usize,
) -> Result<FillVector> {
    if choice_count == 0 {
        return Err(SheetmarkError::InvalidConfig(
            "choice_count must be at least 1".into(),
        ));
    }
    let mut fill = FillVector::zeros(question_count, choice_count);
    if images.len() > fill.capacity() {
        return Err(SheetmarkError::GridMismatch {
            cells: images.len(),
            capacity: fill.capacity(),
        });
    }

    for (i, image) in images.enumerate() {
        fill.set(i / choice_count, i % choice_count, fill_score(image));
    }
    debug!(
        rows = fill.rows(),
        cols = fill.cols(),
        total = fill.iter_rows().flatten().sum::<f32>(),
        "Cells scored"
    );
    Ok(fill)
}
