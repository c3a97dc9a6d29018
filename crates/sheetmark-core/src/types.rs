// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the sheetmark OMR pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MAX_CHOICES;

/// Label identifying which sheet a result belongs to.
///
/// Only used to namespace output; the pipeline treats the unknown sentinel
/// like any other value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(String);

impl SheetId {
    /// Sentinel used when no identifier could be extracted.
    pub const UNKNOWN: &'static str = "unknown_id";

    /// Wrap a label. Blank labels collapse to the unknown sentinel.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        if label.trim().is_empty() {
            Self::unknown()
        } else {
            Self(label)
        }
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SheetId {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resolved answer for one question.
///
/// Serialises as the choice letter (`"A"`, `"B"`, ...) or `"None"` for an
/// unmarked question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Answer {
    /// A choice was marked with enough confidence.
    Choice(char),
    /// The question exists but no choice passed the mark threshold.
    Unmarked,
}

impl Answer {
    /// Text written for [`Answer::Unmarked`].
    pub const UNMARKED_LABEL: &'static str = "None";

    /// Map a zero-based choice index to its letter (`0 -> 'A'`).
    ///
    /// Returns `None` past the last supported letter.
    pub fn from_choice_index(index: usize) -> Option<Self> {
        if index >= MAX_CHOICES {
            return None;
        }
        Some(Self::Choice((b'A' + index as u8) as char))
    }

    /// Zero-based choice index, if marked with an uppercase ASCII letter.
    pub fn choice_index(&self) -> Option<usize> {
        match self {
            Self::Choice(letter) if letter.is_ascii_uppercase() => {
                Some((*letter as u8 - b'A') as usize)
            }
            _ => None,
        }
    }

    pub fn is_marked(&self) -> bool {
        matches!(self, Self::Choice(_))
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Choice(letter) => write!(f, "{letter}"),
            Self::Unmarked => f.write_str(Self::UNMARKED_LABEL),
        }
    }
}

impl From<Answer> for String {
    fn from(answer: Answer) -> Self {
        answer.to_string()
    }
}

impl TryFrom<String> for Answer {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == Self::UNMARKED_LABEL {
            return Ok(Self::Unmarked);
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) if letter.is_ascii_uppercase() => Ok(Self::Choice(letter)),
            _ => Err(format!("not an answer label: {value:?}")),
        }
    }
}

/// Final per-sheet output: 1-based question number to resolved answer.
///
/// Keys are sequential over the questions that were detected on the sheet,
/// not the raw grid row positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<u32, Answer>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question: u32, answer: Answer) -> Option<Answer> {
        self.0.insert(question, answer)
    }

    pub fn get(&self, question: u32) -> Option<Answer> {
        self.0.get(&question).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Answer)> + '_ {
        self.0.iter().map(|(question, answer)| (*question, *answer))
    }

    pub fn question_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    /// Number of questions with a marked choice.
    pub fn marked_count(&self) -> usize {
        self.0.values().filter(|answer| answer.is_marked()).count()
    }
}

impl FromIterator<(u32, Answer)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (u32, Answer)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Row-major matrix of per-cell fill scores (questions x choices).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<f32>>", try_from = "Vec<Vec<f32>>")]
pub struct FillVector {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl FillVector {
    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    /// Build from explicit rows. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, String> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|row| row.len() != cols) {
            return Err(format!(
                "row {bad} has {} values, expected {cols}",
                rows[bad].len()
            ));
        }
        let row_count = rows.len();
        Ok(Self {
            rows: row_count,
            cols,
            values: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of slots (`rows * cols`).
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.values[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.cols;
        &self.values[start..start + self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        // `chunks` panics on 0, and a zero-width matrix has no meaningful rows.
        self.values.chunks(self.cols.max(1)).take(self.rows)
    }
}

impl From<FillVector> for Vec<Vec<f32>> {
    fn from(fill: FillVector) -> Self {
        fill.iter_rows().map(<[f32]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<f32>>> for FillVector {
    type Error = String;

    fn try_from(rows: Vec<Vec<f32>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}
