// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit rendering — draw the answer grid and the resolver's decisions over
// the normalized sheet.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::{debug, instrument};

use crate::grid::CellRect;
use crate::reader::SheetReading;

/// Outline colour for every cell.
pub const GRID_COLOR: Rgb<u8> = Rgb([128, 128, 128]);
/// Outline for the chosen cell of a marked question.
pub const MARKED_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
/// Outline for the fullest cell of an active but unmarked question.
pub const UNMARKED_COLOR: Rgb<u8> = Rgb([220, 0, 0]);

/// Render the normalized image with the grid and decisions drawn on it.
#[instrument(skip_all, fields(answers = reading.answers.len()))]
pub fn annotate(reading: &SheetReading) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(reading.normalized.clone()).to_rgb8();

    for placement in &reading.layout {
        outline(&mut canvas, placement.rect, GRID_COLOR);
    }

    let mut highlighted = 0usize;
    for (row, (_, answer)) in reading.active_rows.iter().zip(reading.answers.iter()) {
        let Some(choice) = row.best_choice else {
            continue;
        };
        let color = if answer.is_marked() {
            MARKED_COLOR
        } else {
            UNMARKED_COLOR
        };
        if let Some(placement) = reading
            .layout
            .iter()
            .find(|p| p.question == row.grid_row && p.choice == choice)
        {
            outline(&mut canvas, placement.rect, color);
            highlighted += 1;
        }
    }
    debug!(highlighted, "Audit image rendered");
    canvas
}

/// Draw a 1 px outline; empty rectangles are skipped.
fn outline(canvas: &mut RgbImage, rect: CellRect, color: Rgb<u8>) {
    if rect.width == 0 || rect.height == 0 {
        return;
    }
    let r = Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height);
    draw_hollow_rect_mut(canvas, r, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundaryDetection;
    use crate::grid::{ActiveRow, CellPlacement};
    use image::{GrayImage, Luma};
    use sheetmark_core::types::{Answer, AnswerMap, FillVector};

    fn placement(question: usize, choice: usize, x: u32) -> CellPlacement {
        CellPlacement {
            question,
            choice,
            rect: CellRect {
                x,
                y: 10 * question as u32,
                width: 10,
                height: 10,
            },
        }
    }

    fn reading() -> SheetReading {
        let layout = vec![
            placement(0, 0, 0),
            placement(0, 1, 10),
            placement(1, 0, 0),
            placement(1, 1, 10),
        ];
        let active_rows = vec![
            ActiveRow {
                grid_row: 0,
                total: 500.0,
                best_choice: Some(1),
                best_fill: 500.0,
            },
            ActiveRow {
                grid_row: 1,
                total: 150.0,
                best_choice: Some(0),
                best_fill: 150.0,
            },
        ];
        let answers: AnswerMap = [(1, Answer::Choice('B')), (2, Answer::Unmarked)]
            .into_iter()
            .collect();
        SheetReading {
            answers,
            fill: FillVector::zeros(2, 2),
            active_rows,
            layout,
            normalized: GrayImage::from_pixel(20, 20, Luma([0u8])),
            boundary: BoundaryDetection::NotFound,
        }
    }

    #[test]
    fn marked_and_unmarked_cells_are_coloured() {
        let out = annotate(&reading());
        assert_eq!(out.dimensions(), (20, 20));
        // Question 1 choice B: x 10..20, y 0..10.
        assert_eq!(*out.get_pixel(10, 0), MARKED_COLOR);
        // Question 2 choice A: x 0..10, y 10..20.
        assert_eq!(*out.get_pixel(0, 10), UNMARKED_COLOR);
        // Question 1 choice A only carries the grid outline.
        assert_eq!(*out.get_pixel(0, 0), GRID_COLOR);
        // Cell interiors keep the sheet pixels.
        assert_eq!(*out.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn empty_cells_are_skipped() {
        let mut reading = reading();
        reading.layout.push(CellPlacement {
            question: 2,
            choice: 0,
            rect: CellRect {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            },
        });
        let out = annotate(&reading);
        assert_eq!(out.dimensions(), (20, 20));
    }
}
