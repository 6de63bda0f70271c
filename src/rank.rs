//! End-to-end ranking
//!
//! filter → transition model → decision graph → value iteration → sort.
//! Each call builds and discards its own matrix, graph and vectors, so
//! concurrent callers never share state.

use crate::config::{load_document, ConfigError, RankConfig};
use crate::graph::{ConstraintSpec, DecisionGraph, GraphError, GraphNode, RewardWeights, SoftConstraints};
use crate::solver::{SolveReport, SolverError, UtilitySolver};
use crate::table::filter::apply_hard_constraints;
use crate::table::{HardConstraint, Row, Table, TableError};
use crate::transition::{FeedbackTable, SelectedCorpus, TransitionError, TransitionModelBuilder};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors from a ranking computation
#[derive(Error, Debug)]
pub enum RankError {
    #[error("No rows left after applying hard constraints")]
    EmptyCorpus,

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Transition model error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type RankResult<T> = Result<T, RankError>;

/// What to rank and by which preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankRequest {
    /// Attribute columns from the outermost level inwards
    pub hierarchy: Vec<String>,
    /// Reward-shaping rules, most important first
    #[serde(default)]
    pub soft_constraints: Vec<ConstraintSpec>,
    /// Explicit reward pairs; derived from soft-constraint order when absent
    #[serde(default)]
    pub reward_weights: Option<RewardWeights>,
    /// Rows failing any of these are dropped before ranking
    #[serde(default)]
    pub hard_constraints: IndexMap<String, HardConstraint>,
}

impl RankRequest {
    pub fn new<S: Into<String>>(hierarchy: impl IntoIterator<Item = S>) -> Self {
        Self {
            hierarchy: hierarchy.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn soft(mut self, spec: ConstraintSpec) -> Self {
        self.soft_constraints.push(spec);
        self
    }

    pub fn hard(mut self, column: impl Into<String>, constraint: HardConstraint) -> Self {
        self.hard_constraints.insert(column.into(), constraint);
        self
    }

    pub fn weights(mut self, weights: RewardWeights) -> Self {
        self.reward_weights = Some(weights);
        self
    }

    /// Load a request document (YAML or JSON by extension)
    pub fn from_path(path: impl AsRef<Path>) -> RankResult<Self> {
        Ok(load_document(path)?)
    }

    /// Explicit weights, or `(0, n)`, `(0, n - 1)`, ... in soft-constraint order
    pub fn reward_weights(&self) -> RewardWeights {
        match &self.reward_weights {
            Some(weights) => weights.clone(),
            None => {
                let names: Vec<&str> = self.soft_constraints.iter().map(|s| s.name.as_str()).collect();
                RewardWeights::by_priority(&names)
            }
        }
    }
}

/// One ranked leaf as handed to the result consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    #[serde(flatten)]
    pub row: Row,
    pub utility_value: f64,
    pub path_utility: f64,
}

/// Ranked leaves plus solver diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    pub items: Vec<RankedItem>,
    pub report: SolveReport,
    pub state_count: usize,
}

/// Record nodes by descending path utility; ties keep corpus order
pub fn ranked_leaves(graph: &DecisionGraph) -> Vec<&GraphNode> {
    let mut leaves: Vec<&GraphNode> = graph.leaves().collect();
    leaves.sort_by(|a, b| {
        let pa = a.path_utility().unwrap_or(f64::NEG_INFINITY);
        let pb = b.path_utility().unwrap_or(f64::NEG_INFINITY);
        pb.total_cmp(&pa)
    });
    leaves
}

/// Run the whole computation for one request
pub fn rank(
    corpus: &Table,
    selected: Option<&SelectedCorpus>,
    feedback: Option<&FeedbackTable>,
    request: &RankRequest,
    config: &RankConfig,
) -> RankResult<Ranking> {
    config.validate()?;

    let corpus = apply_hard_constraints(corpus, &request.hard_constraints);
    if corpus.is_empty() {
        return Err(RankError::EmptyCorpus);
    }
    info!("Ranking {} rows over hierarchy {:?}", corpus.len(), request.hierarchy);

    let constraints = SoftConstraints::from_specs(&request.soft_constraints)?;
    let weights = request.reward_weights();

    let model = TransitionModelBuilder::new(&corpus, &request.hierarchy)
        .selected(selected)
        .feedback(feedback)
        .config(config.transition)
        .build()?;

    let mut graph = DecisionGraph::new(&corpus, &request.hierarchy, model, &constraints, &weights)?;
    let report = UtilitySolver::new(config.solver).solve(&mut graph)?;

    let items = ranked_leaves(&graph)
        .into_iter()
        .filter_map(|node| {
            Some(RankedItem {
                row: node.row()?.clone(),
                utility_value: node.utility_value(),
                path_utility: node.path_utility()?,
            })
        })
        .collect();

    Ok(Ranking {
        items,
        report,
        state_count: graph.node_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn corpus() -> Table {
        Table::from_json_str(
            r#"[
                {"id": 1, "intent": "classify", "algorithm": "svm",  "accuracy": 0.70},
                {"id": 2, "intent": "classify", "algorithm": "tree", "accuracy": 0.95},
                {"id": 3, "intent": "classify", "algorithm": "svm",  "accuracy": 0.90},
                {"id": 4, "intent": "regress",  "algorithm": "ols",  "accuracy": 0.60}
            ]"#,
        )
        .unwrap()
    }

    fn ids(ranking: &Ranking) -> Vec<i64> {
        ranking
            .items
            .iter()
            .map(|item| match item.row["id"] {
                Value::Integer(i) => i,
                _ => -1,
            })
            .collect()
    }

    #[test]
    fn test_rank_by_numeric_preference() {
        let request = RankRequest::new(["intent", "algorithm"])
            .soft(ConstraintSpec::numerical("accuracy", Some(0.85), None));
        let ranking = rank(&corpus(), None, None, &request, &RankConfig::default()).unwrap();

        assert_eq!(ranking.items.len(), 4);
        assert_eq!(ids(&ranking), vec![2, 3, 1, 4]);
        // records are absorbing, so their utility is their reward
        let rewards: Vec<f64> = ranking.items.iter().map(|i| i.utility_value).collect();
        assert_eq!(rewards, vec![1.0, 1.0, 0.0, 0.0]);
        // rewarded svm row lifts the unrewarded one above the regress branch
        assert!(ranking.items[2].path_utility > 0.0);
        assert_eq!(ranking.items[3].path_utility, 0.0);
        assert_eq!(ranking.state_count, 2 + 3 + 4);
    }

    #[test]
    fn test_hard_constraints_filter_first() {
        let request = RankRequest::new(["intent", "algorithm"])
            .hard("intent", HardConstraint::equals("classify"))
            .soft(ConstraintSpec::categorical("algorithm", "svm"));
        let ranking = rank(&corpus(), None, None, &request, &RankConfig::default()).unwrap();
        assert_eq!(ids(&ranking), vec![1, 3, 2]);
    }

    #[test]
    fn test_empty_after_filtering() {
        let request = RankRequest::new(["intent", "algorithm"])
            .hard("accuracy", HardConstraint::range(Some(2.0), None));
        assert!(matches!(
            rank(&corpus(), None, None, &request, &RankConfig::default()),
            Err(RankError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_invalid_constraint_aborts() {
        let request = RankRequest::new(["intent", "algorithm"])
            .soft(ConstraintSpec::numerical("accuracy", Some(0.9), Some(0.1)));
        assert!(matches!(
            rank(&corpus(), None, None, &request, &RankConfig::default()),
            Err(RankError::Graph(GraphError::InvalidConstraint { .. }))
        ));
    }

    #[test]
    fn test_priority_weights_by_default() {
        let request = RankRequest::new(["intent"])
            .soft(ConstraintSpec::categorical("algorithm", "svm"))
            .soft(ConstraintSpec::categorical("intent", "regress"));
        let weights = request.reward_weights();
        assert_eq!(weights.get("algorithm").high, 2.0);
        assert_eq!(weights.get("intent").high, 1.0);
    }

    #[test]
    fn test_ranked_leaves_tolerates_nan() {
        let table = corpus();
        let hierarchy = vec!["intent".to_string(), "algorithm".to_string()];
        let model = TransitionModelBuilder::new(&table, &hierarchy).build().unwrap();
        let mut graph =
            DecisionGraph::new(&table, &hierarchy, model, &SoftConstraints::new(), &RewardWeights::new())
                .unwrap();
        graph.set_path_utilities(&[1.0, f64::NAN, 3.0, 0.5]).unwrap();

        let finite: Vec<f64> = ranked_leaves(&graph)
            .iter()
            .filter_map(|n| n.path_utility())
            .filter(|p| p.is_finite())
            .collect();
        assert_eq!(finite, vec![3.0, 1.0, 0.5]);
    }

    #[test]
    fn test_equal_utilities_keep_corpus_order() {
        let table = corpus();
        let hierarchy = vec!["intent".to_string(), "algorithm".to_string()];
        let model = TransitionModelBuilder::new(&table, &hierarchy).build().unwrap();
        let mut graph =
            DecisionGraph::new(&table, &hierarchy, model, &SoftConstraints::new(), &RewardWeights::new())
                .unwrap();
        graph.set_path_utilities(&[2.0, 5.0, 2.0, 2.0]).unwrap();

        let rows: Vec<usize> = ranked_leaves(&graph)
            .iter()
            .filter_map(|n| n.record().map(|r| r.row_index))
            .collect();
        assert_eq!(rows, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_ranked_item_serializes_flat() {
        let request = RankRequest::new(["intent", "algorithm"]);
        let ranking = rank(&corpus(), None, None, &request, &RankConfig::default()).unwrap();
        let json = serde_json::to_value(&ranking.items[0]).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["path_utility"], 0.0);
        assert!(json.get("utility_value").is_some());
    }
}
