// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer resolution — turn per-question fill rows into answer letters.
//
// Two steps:
//
// 1. `active_rows` drops grid rows whose total fill is below the
//    low-activity threshold. Those are slots with no printed question.
// 2. `renumber` numbers the surviving rows 1, 2, 3, ... and decides each
//    answer against the mark threshold.
//
// Because numbering happens after filtering, a real question whose row is
// blank enough to fall below the low-activity threshold disappears and every
// later question shifts down by one. Layouts where that can happen need a
// lower `low_activity` threshold.

use serde::{Deserialize, Serialize};
use sheetmark_core::config::ResolverThresholds;
use sheetmark_core::types::{Answer, AnswerMap, FillVector};
use tracing::{debug, instrument};

/// A grid row that passed the low-activity filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveRow {
    /// Row index in the fill matrix.
    pub grid_row: usize,
    /// Sum of all choices in the row.
    pub total: f32,
    /// Index of the fullest choice (lowest index on ties), if the row has
    /// any choices.
    pub best_choice: Option<usize>,
    /// Fill of `best_choice`.
    pub best_fill: f32,
}

/// Rows among the first `question_count` whose total fill is at least
/// `low_activity`, in grid order.
pub fn active_rows(fill: &FillVector, question_count: usize, low_activity: f32) -> Vec<ActiveRow> {
    fill.iter_rows()
        .take(question_count)
        .enumerate()
        .filter_map(|(grid_row, row)| {
            let total: f32 = row.iter().sum();
            if total < low_activity {
                return None;
            }
            let best = arg_max_first(row);
            Some(ActiveRow {
                grid_row,
                total,
                best_choice: best.map(|(index, _)| index),
                best_fill: best.map_or(0.0, |(_, value)| value),
            })
        })
        .collect()
}

/// Number active rows from 1 and decide each answer.
///
/// A row is answered when its best fill is strictly greater than
/// `mark_threshold`; otherwise it is [`Answer::Unmarked`].
pub fn renumber(rows: &[ActiveRow], mark_threshold: f32) -> AnswerMap {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let answer = row
                .best_choice
                .filter(|_| row.best_fill > mark_threshold)
                .and_then(Answer::from_choice_index)
                .unwrap_or(Answer::Unmarked);
            ((i + 1) as u32, answer)
        })
        .collect()
}

/// Resolve a whole fill matrix into an [`AnswerMap`].
#[instrument(skip_all, fields(rows = fill.rows(), question_count = question_count))]
pub fn resolve(
    fill: &FillVector,
    question_count: usize,
    thresholds: &ResolverThresholds,
) -> AnswerMap {
    let rows = active_rows(fill, question_count, thresholds.low_activity);
    let answers = renumber(&rows, thresholds.mark);
    debug!(
        active = rows.len(),
        skipped = fill.rows().min(question_count) - rows.len(),
        marked = answers.marked_count(),
        "Answers resolved"
    );
    answers
}

/// Index and value of the maximum, first occurrence on ties.
fn arg_max_first(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, value)| match best {
            Some((_, best_value)) if value <= best_value => best,
            _ => Some((i, value)),
        })
}
