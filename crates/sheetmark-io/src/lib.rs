// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sheetmark-io — Batch input and output for the sheetmark OMR pipeline.
//
// Sheet sources (image directories, scanned PDFs), sheet identification
// (fixed, filename, OCR), result sinks (per-sheet-ID directories), and the
// batch runner tying them to a `SheetReader`.

pub mod batch;
pub mod identify;
pub mod pdf;
pub mod sink;
pub mod source;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use batch::{BatchRunner, BatchSummary, SheetFailure};
pub use identify::{SheetIdentifier, StemIdentifier, UnknownIdentifier, parse_sheet_id};
pub use pdf::PdfSource;
pub use sink::{DirectorySink, ResultSink};
pub use source::{ImageDirSource, SheetEntry, SheetSource};

#[cfg(feature = "ocr")]
pub use ocr::{OcrIdentifier, OcrModels};
