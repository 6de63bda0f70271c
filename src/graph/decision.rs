//! Decision graph construction and result write-back

use super::constraint::{RewardWeights, SoftConstraints};
use super::node::{GraphNode, NodeKind};
use super::reward::record_rewards;
use super::{GraphError, GraphResult};
use crate::table::Table;
use crate::transition::{PositionIndex, TransitionModel};
use ndarray::{Array1, Array2};
use tracing::info;

/// Layered graph over the state ordering of a [`TransitionModel`].
///
/// Node `i` of the arena is the state at position `i`: attribute values level
/// by level, then one record per corpus row. The graph owns the transition
/// model it was built on, so matrix, rewards and utilities always agree on
/// the ordering.
#[derive(Debug, Clone)]
pub struct DecisionGraph {
    hierarchy: Vec<String>,
    nodes: Vec<GraphNode>,
    model: TransitionModel,
    /// Corpus row -> record position
    leaves: Vec<usize>,
}

impl DecisionGraph {
    /// Build the graph and its rewards
    pub fn new(
        corpus: &Table,
        hierarchy: &[String],
        model: TransitionModel,
        constraints: &SoftConstraints,
        weights: &RewardWeights,
    ) -> GraphResult<Self> {
        check_model(corpus, hierarchy, &model)?;

        let index = model.index();
        let rewards = record_rewards(corpus, constraints, weights)?;
        let mut nodes = Vec::with_capacity(index.len());

        let last = hierarchy.len() - 1;
        for (level, block) in index.levels().iter().enumerate() {
            if level < last {
                let children = level_children(corpus, index, level);
                for (value, kids) in block.values.iter().zip(children) {
                    let key = nodes.len();
                    nodes.push(GraphNode::attribute(key, NodeKind::Inner, level, value.clone(), kids));
                }
            } else {
                let mut offset = index.record_base();
                for (value, &count) in block.values.iter().zip(index.record_counts()) {
                    let key = nodes.len();
                    let kids = (offset..offset + count).collect();
                    nodes.push(GraphNode::attribute(key, NodeKind::AttributeLeaf, level, value.clone(), kids));
                    offset += count;
                }
            }
        }

        for key in index.record_base()..index.len() {
            let row_index = index
                .record_row(key)
                .ok_or_else(|| GraphError::ModelMismatch(format!("no corpus row for record position {}", key)))?;
            let row = corpus.row(row_index).cloned().unwrap_or_default();
            nodes.push(GraphNode::new_record(key, hierarchy.len(), row_index, row, rewards[row_index]));
        }

        let leaves = (0..corpus.len())
            .filter_map(|row| index.record_position(row))
            .collect();

        info!(
            "Decision graph built: {} nodes, {} leaves, {} levels",
            nodes.len(),
            corpus.len(),
            hierarchy.len()
        );

        Ok(Self {
            hierarchy: hierarchy.to_vec(),
            nodes,
            model,
            leaves,
        })
    }

    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    pub fn index(&self) -> &PositionIndex {
        self.model.index()
    }

    pub fn transition_matrix(&self) -> &Array2<f64> {
        self.model.matrix()
    }

    pub fn model(&self) -> &TransitionModel {
        &self.model
    }

    /// Total number of states
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, key: usize) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    /// Record nodes in corpus order
    pub fn leaves(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.leaves.iter().map(move |&key| &self.nodes[key])
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Nodes strictly between the first hierarchy level and the records
    pub fn inner_nodes(&self) -> Vec<&GraphNode> {
        self.nodes
            .iter()
            .filter(|n| n.level > 0 && !n.is_record())
            .collect()
    }

    /// Terminal attribute nodes in position order; each owns a contiguous block of records
    pub fn record_parents(&self) -> &[GraphNode] {
        let terminal = self.index().terminal_level();
        &self.nodes[terminal.positions()]
    }

    /// Reward per position: zeros for attribute values, row rewards for records
    pub fn reward_vector(&self) -> Array1<f64> {
        self.nodes.iter().map(|n| n.reward).collect()
    }

    /// Current utility per position
    pub fn utility_vector(&self) -> Array1<f64> {
        self.nodes.iter().map(|n| n.utility_value).collect()
    }

    /// Write utilities back, one per position
    pub fn set_utility_values(&mut self, utilities: &[f64]) -> GraphResult<()> {
        expect_len("utility values", self.nodes.len(), utilities.len())?;
        for (node, &u) in self.nodes.iter_mut().zip(utilities) {
            node.utility_value = u;
        }
        Ok(())
    }

    /// Write path utilities back, one per leaf in corpus order
    pub fn set_path_utilities(&mut self, path_utilities: &[f64]) -> GraphResult<()> {
        expect_len("path utilities", self.leaves.len(), path_utilities.len())?;
        for (&key, &p) in self.leaves.iter().zip(path_utilities) {
            if let Some(record) = self.nodes[key].record.as_mut() {
                record.path_utility = p;
            }
        }
        Ok(())
    }

    /// Replace rewards, one per position
    pub fn set_rewards(&mut self, rewards: &[f64]) -> GraphResult<()> {
        expect_len("rewards", self.nodes.len(), rewards.len())?;
        for (node, &r) in self.nodes.iter_mut().zip(rewards) {
            node.reward = r;
        }
        Ok(())
    }
}

fn expect_len(what: &'static str, expected: usize, actual: usize) -> GraphResult<()> {
    if expected != actual {
        return Err(GraphError::ShapeMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_model(corpus: &Table, hierarchy: &[String], model: &TransitionModel) -> GraphResult<()> {
    let index = model.index();
    if hierarchy.is_empty() {
        return Err(GraphError::ModelMismatch("empty hierarchy".to_string()));
    }
    let columns: Vec<&String> = index.levels().iter().map(|b| &b.column).collect();
    if columns.len() != hierarchy.len() || columns.iter().zip(hierarchy).any(|(a, b)| *a != b) {
        return Err(GraphError::ModelMismatch(format!(
            "model levels {:?} differ from hierarchy {:?}",
            columns, hierarchy
        )));
    }
    if index.record_count() != corpus.len() {
        return Err(GraphError::ModelMismatch(format!(
            "model has {} records, corpus has {} rows",
            index.record_count(),
            corpus.len()
        )));
    }
    if model.matrix().nrows() != index.len() || model.matrix().ncols() != index.len() {
        return Err(GraphError::ModelMismatch(format!(
            "matrix is {:?}, index has {} states",
            model.matrix().dim(),
            index.len()
        )));
    }
    Ok(())
}

/// Child positions of every value at `level`, in value order
fn level_children(corpus: &Table, index: &PositionIndex, level: usize) -> Vec<Vec<usize>> {
    let (Some(block), Some(next)) = (index.level(level), index.level(level + 1)) else {
        return Vec::new();
    };
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); block.len()];
    for row in 0..corpus.len() {
        let parent = corpus.cell(row, &block.column).as_key();
        let child = corpus.cell(row, &next.column).as_key();
        if let (Some(parent), Some(child)) = (parent, child) {
            if let (Some(p), Some(c)) = (index.position(level, &parent), index.position(level + 1, &child)) {
                children[p - block.start].push(c);
            }
        }
    }
    for kids in &mut children {
        kids.sort_unstable();
        kids.dedup();
    }
    children
}
