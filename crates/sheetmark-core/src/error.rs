// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for sheetmark.

use thiserror::Error;

/// Top-level error type for all sheetmark operations.
#[derive(Debug, Error)]
pub enum SheetmarkError {
    // -- Input --
    #[error("malformed input image: {0}")]
    MalformedInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Geometry / grid --
    #[error("degenerate corner set: {0}")]
    DegenerateCorners(String),

    #[error("perspective correction failed: {0}")]
    Geometry(String),

    #[error("grid produced {cells} cells but the fill matrix only has {capacity} slots")]
    GridMismatch { cells: usize, capacity: usize },

    // -- Collaborators --
    #[error("image processing failed: {0}")]
    Image(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SheetmarkError>;
