//! Soft constraints and reward weights
//!
//! A soft constraint never removes a row; it only decides whether the row
//! earns the high or the low reward of its column. Shapes are validated when
//! the constraint is parsed, so reward computation never sees a malformed one.

use super::{GraphError, GraphResult};
use crate::table::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A reward-shaping rule on one column
#[derive(Debug, Clone, PartialEq)]
pub enum SoftConstraint {
    /// Match a single categorical value
    Categorical { value: String },
    /// Inclusive numeric interval; an open bound falls back to the column's empirical min/max
    Range { low: Option<f64>, high: Option<f64> },
}

impl SoftConstraint {
    pub fn categorical(value: impl Into<String>) -> Self {
        SoftConstraint::Categorical { value: value.into() }
    }

    /// Validated numeric range
    pub fn range(column: &str, low: Option<f64>, high: Option<f64>) -> GraphResult<Self> {
        if low.is_some_and(f64::is_nan) || high.is_some_and(f64::is_nan) {
            return Err(invalid(column, "range bound is NaN"));
        }
        if let (Some(lo), Some(hi)) = (low, high) {
            if lo > hi {
                return Err(invalid(column, format!("range min {} exceeds max {}", lo, hi)));
            }
        }
        Ok(SoftConstraint::Range { low, high })
    }

    /// Parse the raw shape: a scalar is categorical, a two-element array of
    /// numbers or nulls is a range. Anything else is rejected.
    pub fn from_json(column: &str, raw: &serde_json::Value) -> GraphResult<Self> {
        match raw {
            serde_json::Value::String(s) => Ok(Self::categorical(s.clone())),
            serde_json::Value::Number(_) | serde_json::Value::Bool(_) => {
                let key = Value::from(raw.clone())
                    .as_key()
                    .ok_or_else(|| invalid(column, "empty categorical value"))?;
                Ok(Self::categorical(key))
            }
            serde_json::Value::Array(items) if items.len() == 2 => {
                let low = range_bound(column, &items[0])?;
                let high = range_bound(column, &items[1])?;
                Self::range(column, low, high)
            }
            other => Err(invalid(
                column,
                format!("expected a categorical value or a [min, max] pair, found {}", other),
            )),
        }
    }
}

fn range_bound(column: &str, raw: &serde_json::Value) -> GraphResult<Option<f64>> {
    match raw {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(n.as_f64()),
        other => Err(invalid(column, format!("range bound {} is not a number", other))),
    }
}

fn invalid(column: &str, reason: impl Into<String>) -> GraphError {
    GraphError::InvalidConstraint {
        column: column.to_string(),
        reason: reason.into(),
    }
}

/// Typed constraint document as submitted with a ranking request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    /// Column the constraint applies to
    pub name: String,
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    Categorical {
        value: Value,
    },
    Numerical {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
}

impl ConstraintSpec {
    pub fn categorical(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Categorical { value: value.into() },
        }
    }

    pub fn numerical(name: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Numerical { min, max },
        }
    }

    pub fn to_constraint(&self) -> GraphResult<SoftConstraint> {
        match &self.kind {
            ConstraintKind::Categorical { value } => value
                .as_key()
                .map(SoftConstraint::categorical)
                .ok_or_else(|| invalid(&self.name, "categorical value is null")),
            ConstraintKind::Numerical { min, max } => SoftConstraint::range(&self.name, *min, *max),
        }
    }
}

/// Soft constraints keyed by column, in submission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoftConstraints {
    constraints: IndexMap<String, SoftConstraint>,
}

impl SoftConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a list of typed documents. A later document for the same column replaces an earlier one.
    pub fn from_specs(specs: &[ConstraintSpec]) -> GraphResult<Self> {
        let mut constraints = Self::new();
        for spec in specs {
            constraints.insert(spec.name.clone(), spec.to_constraint()?);
        }
        Ok(constraints)
    }

    /// Validate a raw `{column: shape}` object
    pub fn from_json_map(raw: &serde_json::Map<String, serde_json::Value>) -> GraphResult<Self> {
        let mut constraints = Self::new();
        for (column, shape) in raw {
            if shape.is_null() {
                continue;
            }
            constraints.insert(column.clone(), SoftConstraint::from_json(column, shape)?);
        }
        Ok(constraints)
    }

    pub fn insert(&mut self, column: impl Into<String>, constraint: SoftConstraint) {
        self.constraints.insert(column.into(), constraint);
    }

    pub fn get(&self, column: &str) -> Option<&SoftConstraint> {
        self.constraints.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SoftConstraint)> {
        self.constraints.iter()
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.constraints.keys()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// `(reward_low, reward_high)` for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardPair {
    pub low: f64,
    pub high: f64,
}

impl RewardPair {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl Default for RewardPair {
    fn default() -> Self {
        Self { low: 0.0, high: 1.0 }
    }
}

impl From<(f64, f64)> for RewardPair {
    fn from((low, high): (f64, f64)) -> Self {
        Self { low, high }
    }
}

/// Per-column reward pairs; columns without an entry use `(0, 1)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardWeights {
    weights: IndexMap<String, RewardPair>,
}

impl RewardWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weights from priority order: with `n` columns the first gets `(0, n)`,
    /// the next `(0, n - 1)`, down to `(0, 1)` for the last.
    pub fn by_priority<S: AsRef<str>>(columns: &[S]) -> Self {
        let n = columns.len();
        let weights = columns
            .iter()
            .enumerate()
            .map(|(k, c)| (c.as_ref().to_string(), RewardPair::new(0.0, (n - k) as f64)))
            .collect();
        Self { weights }
    }

    pub fn set(&mut self, column: impl Into<String>, pair: impl Into<RewardPair>) {
        self.weights.insert(column.into(), pair.into());
    }

    pub fn get(&self, column: &str) -> RewardPair {
        self.weights.get(column).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
