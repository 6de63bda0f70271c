//! Hard-constraint pre-filtering
//!
//! Hard constraints remove rows before any ranking happens. A range keeps
//! rows inside its closed bounds (open bounds are not checked), an equality
//! keeps rows whose categorical key matches.
//!
//! In documents a range is a map with `low`/`high` (or `min`/`max`) keys and
//! nothing else; any other scalar is an equality.

use super::{Row, Table, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// A hard filter on one column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HardConstraint {
    Range {
        low: Option<f64>,
        high: Option<f64>,
    },
    Equals(Value),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeDoc {
    #[serde(default, alias = "min")]
    low: Option<f64>,
    #[serde(default, alias = "max")]
    high: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HardConstraintDoc {
    Range(RangeDoc),
    Equals(Value),
}

impl From<HardConstraintDoc> for HardConstraint {
    fn from(doc: HardConstraintDoc) -> Self {
        match doc {
            HardConstraintDoc::Range(RangeDoc { low, high }) => HardConstraint::Range { low, high },
            HardConstraintDoc::Equals(value) => HardConstraint::Equals(value),
        }
    }
}

impl<'de> Deserialize<'de> for HardConstraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        HardConstraintDoc::deserialize(deserializer).map(Into::into)
    }
}

impl HardConstraint {
    pub fn range(low: Option<f64>, high: Option<f64>) -> Self {
        HardConstraint::Range { low, high }
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        HardConstraint::Equals(value.into())
    }

    /// Whether a cell passes this constraint
    pub fn accepts(&self, cell: &Value) -> bool {
        match self {
            HardConstraint::Range { low, high } => {
                let Some(x) = cell.as_f64() else {
                    return false;
                };
                low.map_or(true, |lo| x >= lo) && high.map_or(true, |hi| x <= hi)
            }
            HardConstraint::Equals(target) => match (cell.as_key(), target.as_key()) {
                (Some(a), Some(b)) => a == b,
                (None, None) => true,
                _ => false,
            },
        }
    }
}

/// Apply every hard constraint in order. Constraints on absent columns see null cells.
pub fn apply_hard_constraints(table: &Table, constraints: &IndexMap<String, HardConstraint>) -> Table {
    if constraints.is_empty() {
        return table.clone();
    }
    table.retain_rows(|row: &Row| {
        constraints
            .iter()
            .all(|(column, constraint)| constraint.accepts(row.get(column).unwrap_or(&Value::Null)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Table {
        Table::from_json_str(
            r#"[
                {"domain": "vision", "epochs": 10},
                {"domain": "vision", "epochs": 50},
                {"domain": "text", "epochs": 30},
                {"domain": "text", "epochs": "n/a"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_range_with_open_bound() {
        let mut constraints = IndexMap::new();
        constraints.insert("epochs".to_string(), HardConstraint::range(Some(20.0), None));
        let filtered = apply_hard_constraints(&corpus(), &constraints);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.cell(0, "epochs"), &Value::Integer(50));
        assert_eq!(filtered.cell(1, "epochs"), &Value::Integer(30));
    }

    #[test]
    fn test_equals_and_range_combined() {
        let mut constraints = IndexMap::new();
        constraints.insert("domain".to_string(), HardConstraint::equals("text"));
        constraints.insert("epochs".to_string(), HardConstraint::range(None, Some(40.0)));
        let filtered = apply_hard_constraints(&corpus(), &constraints);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.cell(0, "epochs"), &Value::Integer(30));
    }

    #[test]
    fn test_deserialize_shapes() {
        let parsed: IndexMap<String, HardConstraint> =
            serde_json::from_str(r#"{"domain": "vision", "epochs": {"low": 5, "high": null}}"#).unwrap();
        assert_eq!(parsed["domain"], HardConstraint::equals("vision"));
        assert_eq!(parsed["epochs"], HardConstraint::range(Some(5.0), None));
    }

    #[test]
    fn test_min_max_keys_filter_like_low_high() {
        let parsed: IndexMap<String, HardConstraint> =
            serde_json::from_str(r#"{"epochs": {"min": 20}}"#).unwrap();
        assert_eq!(parsed["epochs"], HardConstraint::range(Some(20.0), None));

        let filtered = apply_hard_constraints(&corpus(), &parsed);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.cell(0, "epochs"), &Value::Integer(50));
        assert_eq!(filtered.cell(1, "epochs"), &Value::Integer(30));
    }

    #[test]
    fn test_unknown_range_keys_are_rejected() {
        for doc in [
            r#"{"epochs": {"minimum": 20}}"#,
            r#"{"epochs": {"low": 5, "upper": 40}}"#,
            r#"{"epochs": {"lo": 5}}"#,
        ] {
            let parsed: Result<IndexMap<String, HardConstraint>, _> = serde_json::from_str(doc);
            assert!(parsed.is_err(), "{} should not parse", doc);
        }
    }

    #[test]
    fn test_serialized_range_parses_back() {
        let range = HardConstraint::range(None, Some(40.0));
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(serde_json::from_str::<HardConstraint>(&json).unwrap(), range);
    }

    #[test]
    fn test_no_constraints_keeps_everything() {
        let filtered = apply_hard_constraints(&corpus(), &IndexMap::new());
        assert_eq!(filtered.len(), 4);
    }
}
