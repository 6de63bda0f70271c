//! Decision graph nodes
//!
//! Nodes live in one arena owned by [`DecisionGraph`](super::DecisionGraph)
//! and refer to each other by position. Only the graph mutates them.

use crate::table::Row;
use serde::Serialize;

/// Role of a node in the layered graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Attribute value at a non-terminal level
    Inner,
    /// Attribute value at the terminal level; parent of records
    AttributeLeaf,
    /// One concrete corpus row
    Record,
}

/// Row payload carried by record nodes
#[derive(Debug, Clone, PartialEq)]
pub struct RecordData {
    /// Index of the row in the corpus
    pub row_index: usize,
    /// Corpus row, every column
    pub row: Row,
    /// Utility of the full ancestor chain
    pub path_utility: f64,
}

/// A node of the decision graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub(crate) key: usize,
    pub(crate) kind: NodeKind,
    pub(crate) level: usize,
    pub(crate) value: Option<String>,
    pub(crate) children: Vec<usize>,
    pub(crate) reward: f64,
    pub(crate) utility_value: f64,
    pub(crate) record: Option<RecordData>,
}

impl GraphNode {
    pub(crate) fn attribute(key: usize, kind: NodeKind, level: usize, value: String, children: Vec<usize>) -> Self {
        Self {
            key,
            kind,
            level,
            value: Some(value),
            children,
            reward: 0.0,
            utility_value: 0.0,
            record: None,
        }
    }

    pub(crate) fn new_record(key: usize, level: usize, row_index: usize, row: Row, reward: f64) -> Self {
        Self {
            key,
            kind: NodeKind::Record,
            level,
            value: None,
            children: Vec::new(),
            reward,
            utility_value: 0.0,
            record: Some(RecordData {
                row_index,
                row,
                path_utility: 0.0,
            }),
        }
    }

    /// Position of this node in the state ordering
    pub fn key(&self) -> usize {
        self.key
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Depth in the graph; records sit one below the last hierarchy level
    pub fn level(&self) -> usize {
        self.level
    }

    /// Attribute value, `None` for records
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Child positions
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Number of actions available from this state
    pub fn action_count(&self) -> usize {
        self.children.len()
    }

    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub fn utility_value(&self) -> f64 {
        self.utility_value
    }

    pub fn is_record(&self) -> bool {
        self.kind == NodeKind::Record
    }

    pub fn record(&self) -> Option<&RecordData> {
        self.record.as_ref()
    }

    /// Path utility, records only
    pub fn path_utility(&self) -> Option<f64> {
        self.record.as_ref().map(|r| r.path_utility)
    }

    /// Corpus row, records only
    pub fn row(&self) -> Option<&Row> {
        self.record.as_ref().map(|r| &r.row)
    }
}
