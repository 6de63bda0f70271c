//! Transition Model Builder
//!
//! Turns a corpus and an attribute hierarchy into a dense `N×N` matrix over
//! the canonical state ordering of [`PositionIndex`]:
//! - inner-level rows hold empirical conditional probabilities of the next level
//! - terminal attribute values carry a blended self-transition (see [`BlendMode`])
//! - terminal attribute values spread their mass uniformly over their own
//!   records, so rewards on records reach the attribute states (on by default)
//! - record rows are empty: records are absorbing

pub mod builder;
pub mod feedback;
pub mod position;

pub use builder::TransitionModelBuilder;
pub use feedback::{
    feedback_factor, BlendMode, FeedbackEntry, FeedbackTable, SelectedCorpus, FEEDBACK_ALPHA,
};
pub use position::{LevelBlock, PositionIndex};

use crate::table::{csv_field, TableError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

/// Transition model errors
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Hierarchy must name at least one level")]
    EmptyHierarchy,

    #[error("Hierarchy level {0} is not a corpus column")]
    UnknownLevel(String),

    #[error("Row {row} has no value for hierarchy level {column}")]
    MissingValue { row: usize, column: String },

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

pub type TransitionResult<T> = Result<T, TransitionError>;

/// Options for matrix construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// What the terminal self-transition cell holds
    pub blend_mode: BlendMode,
    /// Let terminal attribute values transition uniformly to their records.
    /// Without it no attribute state can see a reward.
    pub link_records: bool,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::default(),
            link_records: true,
        }
    }
}

/// Transition matrix together with the state ordering it is indexed by
#[derive(Debug, Clone)]
pub struct TransitionModel {
    index: PositionIndex,
    matrix: Array2<f64>,
}

impl TransitionModel {
    pub fn index(&self) -> &PositionIndex {
        &self.index
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `matrix[from][to]`, zero outside the matrix
    pub fn probability(&self, from: usize, to: usize) -> f64 {
        self.matrix.get((from, to)).copied().unwrap_or(0.0)
    }

    /// Sum of a row. Non-terminal rows sum to 1 or, for degenerate branches, 0.
    pub fn row_sum(&self, from: usize) -> f64 {
        if from >= self.len() {
            return 0.0;
        }
        self.matrix.row(from).sum()
    }

    pub fn into_parts(self) -> (PositionIndex, Array2<f64>) {
        (self.index, self.matrix)
    }

    /// Write the matrix as CSV with state labels on both axes
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        let labels: Vec<String> = (0..self.len())
            .map(|pos| csv_field(&self.index.label(pos).unwrap_or_default()))
            .collect();

        writeln!(out, ",{}", labels.join(","))?;
        for (pos, row) in self.matrix.rows().into_iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|p| p.to_string()).collect();
            writeln!(out, "{},{}", labels[pos], cells.join(","))?;
        }
        Ok(())
    }
}
