// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sheetmark-vision — Image side of the sheetmark OMR pipeline.
//
// Turns a photographed or scanned answer sheet into an answer map:
// preprocessing (resize, binarise, denoise), boundary detection and
// perspective rectification, grid segmentation, fill scoring, and answer
// resolution. Also renders audit images of the result.

pub mod annotate;
pub mod geometry;
pub mod grid;
pub mod prep;
pub mod reader;

// Re-export the primary entry points so callers can use `sheetmark_vision::SheetReader` etc.
pub use annotate::annotate;
pub use geometry::{BoundaryDetection, CornerSet, Normalized, Normalizer};
pub use grid::{ActiveRow, Cell, CellPlacement, CellRect};
pub use reader::{SheetReader, SheetReading};
