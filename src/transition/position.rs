//! Position index: the canonical state ordering
//!
//! Every distinct hierarchy value gets a contiguous position, level by level,
//! values sorted case-insensitively within a level. Record states follow in
//! one final block, grouped by their terminal attribute value (in that value's
//! position order) and in corpus order within a group. Grouping keeps every
//! attribute leaf's records contiguous, which is what lets the solver find a
//! record's parent by offset arithmetic instead of walking the graph.

use super::{TransitionError, TransitionResult};
use crate::table::Table;
use rustc_hash::FxHashMap;

/// One hierarchy level's block of positions
#[derive(Debug, Clone, PartialEq)]
pub struct LevelBlock {
    /// Column name of this level
    pub column: String,
    /// First position of the block
    pub start: usize,
    /// Distinct values, in position order
    pub values: Vec<String>,
}

impl LevelBlock {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position range covered by the block
    pub fn positions(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.values.len()
    }
}

/// Bijection from (level, value) pairs and corpus rows to `0..N`
#[derive(Debug, Clone)]
pub struct PositionIndex {
    levels: Vec<LevelBlock>,
    lookup: FxHashMap<(usize, String), usize>,
    /// Corpus row -> record position
    record_positions: Vec<usize>,
    /// Record position - record_base -> corpus row
    record_rows: Vec<usize>,
    /// Records per terminal value, aligned with the last level's values
    record_counts: Vec<usize>,
    record_base: usize,
}

impl PositionIndex {
    /// Assign positions for a corpus and hierarchy
    pub fn build(table: &Table, hierarchy: &[String]) -> TransitionResult<Self> {
        if hierarchy.is_empty() {
            return Err(TransitionError::EmptyHierarchy);
        }

        let mut levels = Vec::with_capacity(hierarchy.len());
        let mut lookup = FxHashMap::default();
        let mut pos = 0;

        for (level, column) in hierarchy.iter().enumerate() {
            if !table.has_column(column) {
                return Err(TransitionError::UnknownLevel(column.clone()));
            }
            let values = table.distinct_keys(column)?;
            let start = pos;
            for value in &values {
                lookup.insert((level, value.clone()), pos);
                pos += 1;
            }
            levels.push(LevelBlock {
                column: column.clone(),
                start,
                values,
            });
        }

        // Every row must sit somewhere in every level, otherwise its record
        // would have no ancestor chain.
        for row in 0..table.len() {
            for column in hierarchy {
                if table.cell(row, column).is_null() {
                    return Err(TransitionError::MissingValue {
                        row,
                        column: column.clone(),
                    });
                }
            }
        }

        let record_base = pos;
        let last = hierarchy.len() - 1;
        let terminal = &levels[last];

        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); terminal.len()];
        for row in 0..table.len() {
            let key = table.cell(row, &terminal.column).as_key().unwrap_or_default();
            let Some(&position) = lookup.get(&(last, key)) else {
                return Err(TransitionError::MissingValue {
                    row,
                    column: terminal.column.clone(),
                });
            };
            groups[position - terminal.start].push(row);
        }

        let record_counts: Vec<usize> = groups.iter().map(Vec::len).collect();
        let record_rows: Vec<usize> = groups.into_iter().flatten().collect();
        let mut record_positions = vec![0; table.len()];
        for (offset, &row) in record_rows.iter().enumerate() {
            record_positions[row] = record_base + offset;
        }

        Ok(Self {
            levels,
            lookup,
            record_positions,
            record_rows,
            record_counts,
            record_base,
        })
    }

    /// Total number of states (attribute values + records)
    pub fn len(&self) -> usize {
        self.record_base + self.record_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[LevelBlock] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Option<&LevelBlock> {
        self.levels.get(level)
    }

    /// The terminal attribute level, parent of every record
    pub fn terminal_level(&self) -> &LevelBlock {
        // build() rejects empty hierarchies
        &self.levels[self.levels.len() - 1]
    }

    /// Position of a value at a level
    pub fn position(&self, level: usize, value: &str) -> Option<usize> {
        self.lookup.get(&(level, value.to_string())).copied()
    }

    /// First record position
    pub fn record_base(&self) -> usize {
        self.record_base
    }

    pub fn record_count(&self) -> usize {
        self.record_rows.len()
    }

    /// Position of the record for a corpus row
    pub fn record_position(&self, row: usize) -> Option<usize> {
        self.record_positions.get(row).copied()
    }

    /// Corpus row held at a record position
    pub fn record_row(&self, position: usize) -> Option<usize> {
        position
            .checked_sub(self.record_base)
            .and_then(|offset| self.record_rows.get(offset))
            .copied()
    }

    /// Number of records under each terminal value, in position order
    pub fn record_counts(&self) -> &[usize] {
        &self.record_counts
    }

    /// Which level a position belongs to; `None` for record positions
    pub fn level_of(&self, position: usize) -> Option<usize> {
        self.levels
            .iter()
            .position(|block| block.positions().contains(&position))
    }

    /// Human readable state label, `column=value` or `#row` for records
    pub fn label(&self, position: usize) -> Option<String> {
        if let Some(level) = self.level_of(position) {
            let block = &self.levels[level];
            return Some(format!("{}={}", block.column, block.values[position - block.start]));
        }
        self.record_row(position).map(|row| format!("#{}", row))
    }
}
