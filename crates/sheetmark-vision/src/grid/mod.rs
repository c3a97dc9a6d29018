// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer grid — cell segmentation, fill scoring, and answer resolution.

pub mod resolve;
pub mod score;
pub mod segment;

pub use resolve::{ActiveRow, resolve};
pub use score::{fill_score, score};
pub use segment::{Cell, CellPlacement, CellRect, cell_layout, segment};
