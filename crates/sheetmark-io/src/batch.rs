// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch runner — read every sheet a source yields and persist the results.
// One bad sheet never stops the batch.

use serde::Serialize;
use sheetmark_core::error::Result;
use sheetmark_core::types::SheetId;
use sheetmark_vision::SheetReader;
use tracing::{info, instrument, warn};

use crate::identify::SheetIdentifier;
use crate::sink::ResultSink;
use crate::source::{SheetEntry, SheetSource};

/// A sheet that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetFailure {
    pub entry: String,
    /// Sheet ID, when identification was reached.
    pub sheet_id: Option<String>,
    pub error: String,
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Sheets read and persisted.
    pub processed: usize,
    pub failed: Vec<SheetFailure>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives a [`SheetReader`] over a whole source.
pub struct BatchRunner<'a> {
    reader: &'a SheetReader,
}

impl<'a> BatchRunner<'a> {
    pub fn new(reader: &'a SheetReader) -> Self {
        Self { reader }
    }

    /// Process every entry: load, identify, read, persist.
    ///
    /// Only a failure to enumerate the source is returned as an error;
    /// per-sheet failures are logged and collected in the summary.
    #[instrument(skip_all)]
    pub fn run(
        &self,
        source: &dyn SheetSource,
        identifier: &dyn SheetIdentifier,
        sink: &dyn ResultSink,
    ) -> Result<BatchSummary> {
        let entries = source.entries()?;
        info!(sheets = entries.len(), "Batch started");

        let mut summary = BatchSummary::default();
        for entry in &entries {
            let mut sheet_id = None;
            match self.process(entry, source, identifier, sink, &mut sheet_id) {
                Ok(()) => summary.processed += 1,
                Err(err) => {
                    warn!(
                        sheet = %entry,
                        id = sheet_id.as_ref().map_or("-", SheetId::as_str),
                        error = %err,
                        "Sheet failed; continuing"
                    );
                    summary.failed.push(SheetFailure {
                        entry: entry.name.clone(),
                        sheet_id: sheet_id.map(|id| id.as_str().to_owned()),
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed.len(),
            "Batch finished"
        );
        Ok(summary)
    }

    fn process(
        &self,
        entry: &SheetEntry,
        source: &dyn SheetSource,
        identifier: &dyn SheetIdentifier,
        sink: &dyn ResultSink,
        sheet_id: &mut Option<SheetId>,
    ) -> Result<()> {
        let image = source.load(entry)?;
        let id = sheet_id.insert(identifier.identify(entry, &image));
        let reading = self.reader.read(&image)?;
        sink.persist(id, entry, &reading)?;
        info!(
            sheet = %entry,
            id = %id,
            answers = reading.answers.len(),
            marked = reading.answers.marked_count(),
            "Sheet processed"
        );
        Ok(())
    }
}
