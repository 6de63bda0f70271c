//! Hierank
//!
//! Ranks the rows of a tabular corpus through a hierarchical decision graph.
//!
//! # Architecture
//!
//! - [`table`]: the corpus model (rows of named cells) and hard-constraint filtering
//! - [`transition`]: canonical state ordering and the empirical transition matrix,
//!   optionally biased by a selected corpus and user feedback
//! - [`graph`]: the layered decision graph, soft constraints and record rewards
//! - [`solver`]: value iteration and per-record path utilities
//! - [`rank`]: the end-to-end pipeline producing a ranked list
//! - [`config`]: YAML/JSON configuration of one computation
//!
//! ## Example Usage
//!
//! ```rust
//! use hierank::{rank, ConstraintSpec, RankConfig, RankRequest, Table};
//!
//! let corpus = Table::from_json_str(r#"[
//!     {"intent": "classify", "algorithm": "svm",  "accuracy": 0.71},
//!     {"intent": "classify", "algorithm": "tree", "accuracy": 0.93}
//! ]"#).unwrap();
//!
//! let request = RankRequest::new(["intent", "algorithm"])
//!     .soft(ConstraintSpec::numerical("accuracy", Some(0.9), None));
//!
//! let ranking = rank(&corpus, None, None, &request, &RankConfig::default()).unwrap();
//! assert_eq!(ranking.items[0].row["algorithm"].as_string(), Some("tree"));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;
pub mod rank;
pub mod solver;
pub mod table;
pub mod transition;

// Re-export main types for convenience
pub use config::{load_document, ConfigError, ConfigResult, RankConfig};

pub use graph::{
    ConstraintKind, ConstraintSpec, DecisionGraph, GraphError, GraphNode, GraphResult, NodeKind,
    RewardPair, RewardWeights, SoftConstraint, SoftConstraints,
};

pub use rank::{rank, ranked_leaves, RankError, RankRequest, RankResult, RankedItem, Ranking};

pub use solver::{SolveReport, SolverConfig, SolverError, SolverResult, UtilitySolver};

pub use table::{csv_field, HardConstraint, Row, Table, TableError, TableResult, Value};

pub use transition::{
    BlendMode, FeedbackEntry, FeedbackTable, PositionIndex, SelectedCorpus, TransitionConfig,
    TransitionError, TransitionModel, TransitionModelBuilder, TransitionResult,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.3.0");
    }
}
