// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid segmentation — slice the canonical sheet into answer-choice cells.

use image::GrayImage;
use image::imageops::crop_imm;
use serde::{Deserialize, Serialize};
use sheetmark_core::config::GridGeometry;
use tracing::{debug, instrument};

/// Pixel rectangle in canonical-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Where a cell sits in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPlacement {
    /// Zero-based question slot (column-major over the sheet).
    pub question: usize,
    /// Zero-based choice within the question.
    pub choice: usize,
    pub rect: CellRect,
}

/// One answer bubble cut out of the canonical sheet.
#[derive(Debug, Clone)]
pub struct Cell {
    pub placement: CellPlacement,
    pub image: GrayImage,
}

/// Compute the cell rectangles for an image of `width` x `height`.
///
/// Order is major column, then row within the column, then choice. Lengths
/// that do not divide evenly are spread over the first parts, one pixel each,
/// so the cells still tile their band without gaps.
pub fn cell_layout(width: u32, height: u32, geometry: &GridGeometry) -> Vec<CellPlacement> {
    let top = geometry.top_margin.min(height);
    let bottom = height.saturating_sub(geometry.bottom_margin).max(top);
    let [window_start, window_end] = geometry.horizontal_window;

    let mut layout = Vec::with_capacity(geometry.cell_count());
    for (column, (strip_x, strip_w)) in split_even(width, geometry.column_count)
        .into_iter()
        .enumerate()
    {
        // Clamp the window to the strip so edge strips never overrun.
        let start = window_start.min(strip_w);
        let end = window_end.min(strip_w).max(start);

        for (row, (band_y, band_h)) in split_even(bottom - top, geometry.rows_per_column)
            .into_iter()
            .enumerate()
        {
            let inset_top = geometry.vertical_inset.min(band_h);
            let inset_bottom = band_h.saturating_sub(geometry.vertical_inset).max(inset_top);
            let question = column * geometry.rows_per_column + row;

            for (choice, (cell_x, cell_w)) in split_even(end - start, geometry.choice_count)
                .into_iter()
                .enumerate()
            {
                layout.push(CellPlacement {
                    question,
                    choice,
                    rect: CellRect {
                        x: strip_x + start + cell_x,
                        y: top + band_y + inset_top,
                        width: cell_w,
                        height: inset_bottom - inset_top,
                    },
                });
            }
        }
    }
    layout
}

/// Cut the canonical image into cells following [`cell_layout`].
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn segment(image: &GrayImage, geometry: &GridGeometry) -> Vec<Cell> {
    let cells: Vec<Cell> = cell_layout(image.width(), image.height(), geometry)
        .into_iter()
        .map(|placement| {
            let CellRect {
                x,
                y,
                width,
                height,
            } = placement.rect;
            Cell {
                placement,
                image: crop_imm(image, x, y, width, height).to_image(),
            }
        })
        .collect();
    debug!(cells = cells.len(), "Grid segmented");
    cells
}

/// Split `length` into `parts` contiguous `(offset, length)` spans.
fn split_even(length: u32, parts: usize) -> Vec<(u32, u32)> {
    if parts == 0 {
        return Vec::new();
    }
    let parts = parts as u32;
    let base = length / parts;
    let remainder = length % parts;
    let mut offset = 0;
    (0..parts)
        .map(|i| {
            let span = base + u32::from(i < remainder);
            let piece = (offset, span);
            offset += span;
            piece
        })
        .collect()
}
