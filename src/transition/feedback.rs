//! Prior usage and human feedback inputs
//!
//! Both are optional. A selected-items corpus biases the empirical
//! distribution with repeat counts; a feedback table rescales the terminal
//! self-transition through the blended score.

use super::{TransitionError, TransitionResult};
use crate::table::Table;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Weight of human feedback against the empirical probability
pub const FEEDBACK_ALPHA: f64 = 0.5;

/// Feedback score assumed when a feedback row carries no score
pub const NEUTRAL_FEEDBACK: f64 = 0.5;

/// What the terminal self-transition cell holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Probability scaled by the feedback factor
    Blended,
    /// Plain empirical probability
    #[default]
    Probability,
    /// Always 1.0, feedback ignored
    Constant,
}

/// One feedback row for a terminal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Terminal-level value this feedback refers to
    pub value: String,
    /// Aggregated feedback score; `None` reads as neutral
    #[serde(default)]
    pub feedback: Option<f64>,
    /// Number of observations behind the score
    #[serde(default)]
    pub count: f64,
}

/// Feedback keyed by terminal value
#[derive(Debug, Clone, Default)]
pub struct FeedbackTable {
    entries: FxHashMap<String, FeedbackEntry>,
    max_count: f64,
}

impl FeedbackTable {
    pub fn new(entries: Vec<FeedbackEntry>) -> Self {
        let max_count = entries.iter().map(|e| e.count).fold(0.0, f64::max);
        let entries = entries.into_iter().map(|e| (e.value.clone(), e)).collect();
        Self { entries, max_count }
    }

    pub fn from_json_str(json: &str) -> TransitionResult<Self> {
        let entries: Vec<FeedbackEntry> = serde_json::from_str(json)
            .map_err(|e| TransitionError::Table(e.into()))?;
        Ok(Self::new(entries))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, value: &str) -> Option<&FeedbackEntry> {
        self.entries.get(value)
    }

    /// Largest observation count over all rows
    pub fn max_count(&self) -> f64 {
        self.max_count
    }

    /// Feedback factor `F` for a terminal value.
    ///
    /// A value without a feedback row uses score 0, count 0 and max 0, which
    /// collapses `F` to `1 - alpha`.
    pub fn factor(&self, value: &str) -> f64 {
        match self.entries.get(value) {
            Some(entry) => feedback_factor(entry.feedback, entry.count, self.max_count, FEEDBACK_ALPHA),
            None => feedback_factor(Some(0.0), 0.0, 0.0, FEEDBACK_ALPHA),
        }
    }
}

/// `F = alpha * f_hat * w + (1 - alpha)` with `w = count / max_count` (0 when max is 0)
pub fn feedback_factor(feedback: Option<f64>, count: f64, max_count: f64, alpha: f64) -> f64 {
    let f_hat = feedback.unwrap_or(NEUTRAL_FEEDBACK);
    let w = if max_count > 0.0 { count / max_count } else { 0.0 };
    alpha * f_hat * w + (1.0 - alpha)
}

/// Previously selected items with their repeat counts
#[derive(Debug, Clone)]
pub struct SelectedCorpus {
    table: Table,
    counts: Vec<f64>,
}

impl SelectedCorpus {
    /// Wrap a table whose `count_column` holds the per-row repeat count
    pub fn new(table: Table, count_column: &str) -> TransitionResult<Self> {
        let counts = (0..table.len())
            .map(|row| table.require_f64(row, count_column))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { table, counts })
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Repeat-count sums for rows with `parent_column == parent`, keyed by the child column value
    pub(crate) fn child_counts(
        &self,
        parent_column: &str,
        parent: &str,
        child_column: &str,
    ) -> (f64, FxHashMap<String, f64>) {
        let mut total = 0.0;
        let mut by_child: FxHashMap<String, f64> = FxHashMap::default();
        for (row, &count) in self.counts.iter().enumerate() {
            if self.table.cell(row, parent_column).as_key().as_deref() != Some(parent) {
                continue;
            }
            let Some(child) = self.table.cell(row, child_column).as_key() else {
                continue;
            };
            total += count;
            *by_child.entry(child).or_insert(0.0) += count;
        }
        (total, by_child)
    }
}
