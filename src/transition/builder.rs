//! Transition model construction
//!
//! For each consecutive pair of hierarchy levels the builder counts how often
//! every parent value co-occurs with each child value, optionally adds the
//! repeat counts of a selected-items corpus, and normalizes by the parent's
//! total. The last attribute-level pair additionally writes a terminal value
//! multiplier on each child's own diagonal cell.

use super::feedback::{BlendMode, FeedbackTable, SelectedCorpus};
use super::position::PositionIndex;
use super::{TransitionConfig, TransitionModel, TransitionResult};
use crate::table::Table;
use ndarray::Array2;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

/// Builds a [`TransitionModel`] from a corpus and hierarchy
pub struct TransitionModelBuilder<'a> {
    corpus: &'a Table,
    hierarchy: &'a [String],
    selected: Option<&'a SelectedCorpus>,
    feedback: Option<&'a FeedbackTable>,
    config: TransitionConfig,
}

impl<'a> TransitionModelBuilder<'a> {
    pub fn new(corpus: &'a Table, hierarchy: &'a [String]) -> Self {
        Self {
            corpus,
            hierarchy,
            selected: None,
            feedback: None,
            config: TransitionConfig::default(),
        }
    }

    /// Bias the empirical distribution with previously selected items
    pub fn selected(mut self, selected: Option<&'a SelectedCorpus>) -> Self {
        self.selected = selected;
        self
    }

    /// Feedback used by [`BlendMode::Blended`]
    pub fn feedback(mut self, feedback: Option<&'a FeedbackTable>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.config.blend_mode = mode;
        self
    }

    pub fn link_records(mut self, link: bool) -> Self {
        self.config.link_records = link;
        self
    }

    pub fn config(mut self, config: TransitionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TransitionResult<TransitionModel> {
        let index = PositionIndex::build(self.corpus, self.hierarchy)?;
        let n = index.len();
        let mut matrix = Array2::<f64>::zeros((n, n));

        let no_feedback = FeedbackTable::default();
        let feedback = self.feedback.unwrap_or(&no_feedback);
        let selected = self.selected.filter(|s| !s.is_empty());

        let depth = index.depth();
        for level in 0..depth.saturating_sub(1) {
            let terminal_pair = level + 2 == depth;
            self.fill_level_pair(&index, level, terminal_pair, selected, feedback, &mut matrix);
        }

        if self.config.link_records {
            link_records(&index, &mut matrix);
        }

        info!(
            "Transition model built: {} states ({} attribute values, {} records), blend mode {:?}",
            n,
            index.record_base(),
            index.record_count(),
            self.config.blend_mode
        );

        Ok(TransitionModel { index, matrix })
    }

    fn fill_level_pair(
        &self,
        index: &PositionIndex,
        level: usize,
        terminal_pair: bool,
        selected: Option<&SelectedCorpus>,
        feedback: &FeedbackTable,
        matrix: &mut Array2<f64>,
    ) {
        let parent_column = &self.hierarchy[level];
        let child_column = &self.hierarchy[level + 1];

        // parent -> (row count, child -> pair count)
        let mut counts: FxHashMap<String, (f64, FxHashMap<String, f64>)> = FxHashMap::default();
        for row in 0..self.corpus.len() {
            let (Some(parent), Some(child)) = (
                self.corpus.cell(row, parent_column).as_key(),
                self.corpus.cell(row, child_column).as_key(),
            ) else {
                continue;
            };
            let entry = counts.entry(parent).or_default();
            entry.0 += 1.0;
            *entry.1.entry(child).or_insert(0.0) += 1.0;
        }

        let Some(block) = index.level(level) else {
            return;
        };
        for parent in &block.values {
            let Some(parent_pos) = index.position(level, parent) else {
                continue;
            };
            let Some((rows, children)) = counts.get(parent) else {
                warn!("No rows under {}={}, leaving a zero distribution", parent_column, parent);
                continue;
            };

            let (selected_total, selected_children) = match selected {
                Some(s) => s.child_counts(parent_column, parent, child_column),
                None => (0.0, FxHashMap::default()),
            };
            let total = rows + selected_total;
            if total <= 0.0 {
                warn!("Zero denominator for {}={}, leaving a zero distribution", parent_column, parent);
            }

            let mut ordered: Vec<(usize, &String, f64)> = children
                .iter()
                .filter_map(|(child, &count)| {
                    index
                        .position(level + 1, child)
                        .map(|pos| (pos, child, count))
                })
                .collect();
            ordered.sort_by_key(|(pos, _, _)| *pos);

            for (child_pos, child, count) in ordered {
                let numerator = count + selected_children.get(child).copied().unwrap_or(0.0);
                let prob = if total > 0.0 { numerator / total } else { 0.0 };
                matrix[[parent_pos, child_pos]] = prob;

                if terminal_pair {
                    matrix[[child_pos, child_pos]] = match self.config.blend_mode {
                        BlendMode::Blended => prob * feedback.factor(child),
                        BlendMode::Probability => prob,
                        BlendMode::Constant => 1.0,
                    };
                }
            }
            debug!("{}={} -> {} children over total {}", parent_column, parent, children.len(), total);
        }
    }
}

/// Spread each terminal value's mass uniformly over the records it owns
fn link_records(index: &PositionIndex, matrix: &mut Array2<f64>) {
    let terminal = index.terminal_level();
    let mut offset = index.record_base();
    for (slot, &count) in index.record_counts().iter().enumerate() {
        let parent_pos = terminal.start + slot;
        if count > 0 {
            let prob = 1.0 / count as f64;
            for record_pos in offset..offset + count {
                matrix[[parent_pos, record_pos]] = prob;
            }
        }
        offset += count;
    }
}
