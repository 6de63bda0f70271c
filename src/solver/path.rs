//! Path utility aggregation
//!
//! A record's path utility is the sum of the utilities along its ancestor
//! chain: its value at every hierarchy level above the terminal one, its
//! terminal attribute parent, and the record itself.
//!
//! Records are laid out in contiguous blocks per terminal parent, so the
//! parent of every record is found from a running cumulative offset over the
//! parents' record counts rather than by walking links. Levels above the
//! terminal one are looked up through the row's own values, because one
//! attribute value may sit under several parents.

use crate::graph::{DecisionGraph, GraphNode};
use ndarray::Array1;

/// Running sums of record counts: `offsets[i]..offsets[i + 1]` is parent `i`'s block
pub fn cumulative_offsets(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut total = 0;
    offsets.push(total);
    for &count in counts {
        total += count;
        offsets.push(total);
    }
    offsets
}

/// Path utility of every leaf, in corpus order
pub fn path_utilities(graph: &DecisionGraph, utilities: &Array1<f64>) -> Vec<f64> {
    let index = graph.index();
    let base = index.record_base();
    let parents = graph.record_parents();
    let counts: Vec<usize> = parents.iter().map(GraphNode::action_count).collect();
    let offsets = cumulative_offsets(&counts);

    let mut paths = vec![0.0; graph.leaf_count()];
    for (slot, parent) in parents.iter().enumerate() {
        let parent_utility = utilities[parent.key()];
        for position in base + offsets[slot]..base + offsets[slot + 1] {
            let Some(row) = index.record_row(position) else {
                continue;
            };
            let upper = upper_levels_utility(graph, position, utilities);
            paths[row] = upper + parent_utility + utilities[position];
        }
    }
    paths
}

/// Sum of utilities of a record's values on the levels above the terminal one
fn upper_levels_utility(graph: &DecisionGraph, record: usize, utilities: &Array1<f64>) -> f64 {
    let index = graph.index();
    let Some(row) = graph.node(record).and_then(GraphNode::row) else {
        return 0.0;
    };
    let upper = graph.hierarchy().len().saturating_sub(1);
    graph.hierarchy()[..upper]
        .iter()
        .enumerate()
        .filter_map(|(level, column)| {
            let key = row.get(column)?.as_key()?;
            index.position(level, &key)
        })
        .map(|pos| utilities[pos])
        .sum()
}
