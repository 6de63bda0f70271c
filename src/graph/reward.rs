//! Record rewards from soft constraints

use super::constraint::{RewardPair, RewardWeights, SoftConstraint, SoftConstraints};
use super::GraphResult;
use crate::table::Table;
use tracing::{debug, warn};

/// Reward per corpus row: the sum of one contribution per constrained column.
///
/// Constraints on columns the corpus does not have contribute nothing.
pub fn record_rewards(
    corpus: &Table,
    constraints: &SoftConstraints,
    weights: &RewardWeights,
) -> GraphResult<Vec<f64>> {
    let mut rewards = vec![0.0; corpus.len()];
    for (column, constraint) in constraints.iter() {
        if !corpus.has_column(column) {
            warn!("Soft constraint on unknown column {} ignored", column);
            continue;
        }
        let pair = weights.get(column);
        let contribution = column_rewards(corpus, column, constraint, pair)?;
        for (total, r) in rewards.iter_mut().zip(contribution) {
            *total += r;
        }
        debug!("Applied soft constraint {:?} on {} with {:?}", constraint, column, pair);
    }
    Ok(rewards)
}

/// Contribution of one constrained column for every row
pub fn column_rewards(
    corpus: &Table,
    column: &str,
    constraint: &SoftConstraint,
    pair: RewardPair,
) -> GraphResult<Vec<f64>> {
    let rewards = match constraint {
        SoftConstraint::Categorical { value } => corpus
            .column(column)?
            .map(|cell| {
                if cell.as_key().as_deref() == Some(value.as_str()) {
                    pair.high
                } else {
                    pair.low
                }
            })
            .collect(),
        SoftConstraint::Range { low, high } => {
            let (lo, hi) = effective_bounds(corpus, column, *low, *high)?;
            corpus
                .column(column)?
                .map(|cell| match cell.as_f64() {
                    Some(x) if x >= lo && x <= hi => pair.high,
                    _ => pair.low,
                })
                .collect()
        }
    };
    Ok(rewards)
}

/// Close open range bounds with the column's empirical min/max.
///
/// A column without any numeric cell closes open bounds with NaN, so no row
/// falls inside the interval.
pub fn effective_bounds(
    corpus: &Table,
    column: &str,
    low: Option<f64>,
    high: Option<f64>,
) -> GraphResult<(f64, f64)> {
    let observed = corpus.numeric_range(column)?;
    let lo = low.or(observed.map(|(min, _)| min)).unwrap_or(f64::NAN);
    let hi = high.or(observed.map(|(_, max)| max)).unwrap_or(f64::NAN);
    Ok((lo, hi))
}
