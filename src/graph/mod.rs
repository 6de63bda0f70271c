//! Decision Graph
//!
//! The layered graph the solver runs on:
//! - one inner node per distinct value of every non-terminal hierarchy level
//! - one attribute-leaf node per distinct value of the terminal level
//! - one record node per corpus row, carrying the row and its reward
//!
//! Rewards come from soft constraints (see [`constraint`]); every non-record
//! node has reward zero.

pub mod constraint;
pub mod decision;
pub mod node;
pub mod reward;

pub use constraint::{
    ConstraintKind, ConstraintSpec, RewardPair, RewardWeights, SoftConstraint, SoftConstraints,
};
pub use decision::DecisionGraph;
pub use node::{GraphNode, NodeKind, RecordData};
pub use reward::{column_rewards, effective_bounds, record_rewards};

use crate::table::TableError;
use thiserror::Error;

/// Graph errors
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid constraint for column {column}: {reason}")]
    InvalidConstraint { column: String, reason: String },

    #[error("Transition model does not match the corpus: {0}")]
    ModelMismatch(String),

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}

pub type GraphResult<T> = Result<T, GraphError>;
