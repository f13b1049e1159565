use log::trace;
use std::collections::HashMap;

use crate::common::errors::{FactorError, Result};
use crate::table::backend::{SharedTable, Storage};
use crate::table::models::{Row, Table, VALUE_COLUMN, Value};

/// P(outcomes | givens) over a validated table.
///
/// In P(X, Y | Z, A) the outcomes are X and Y and the givens are Z and A. Every declared
/// variable must have a backing column and the `value` column must exist; extra columns
/// are allowed and ignored. Normalization is not checked on construction, see
/// [`ConditionalProbabilityTable::check_normalized`].
#[derive(Debug, Clone)]
pub struct ConditionalProbabilityTable {
    data: SharedTable,
    outcomes: Vec<String>,
    givens: Vec<String>,
}

impl ConditionalProbabilityTable {
    pub fn new<S: AsRef<str>>(data: SharedTable, outcomes: &[S], givens: &[S]) -> Result<Self> {
        let cpt = ConditionalProbabilityTable {
            data,
            outcomes: outcomes.iter().map(|o| o.as_ref().to_string()).collect(),
            givens: givens.iter().map(|g| g.as_ref().to_string()).collect(),
        };
        cpt.validate()?;
        Ok(cpt)
    }

    /// Prior over `outcome` from `(value, probability)` pairs.
    pub fn prior(storage: &Storage, outcome: &str, distribution: &[(Value, f64)]) -> Result<Self> {
        let rows: Vec<Row> = distribution
            .iter()
            .map(|(value, probability)| vec![value.clone(), Value::Float(*probability)])
            .collect();
        let table = Table::from_rows(&[outcome, VALUE_COLUMN], rows)?;
        ConditionalProbabilityTable::new(storage.create(table)?, &[outcome], &[])
    }

    fn validate(&self) -> Result<()> {
        let table = self.data.read()?;
        table.value_index()?;

        if self.outcomes.is_empty() {
            return Err(FactorError::EmptyOutcomes);
        }

        let variables = table.variables();
        let missing: Vec<String> = self
            .givens
            .iter()
            .chain(self.outcomes.iter())
            .filter(|declared| !variables.contains(*declared))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(FactorError::ColumnMismatch {
                columns: table.columns().to_vec(),
                missing,
            });
        }
        trace!(
            "validated CPT P({:?} | {:?}) over {} rows",
            self.outcomes,
            self.givens,
            table.len()
        );
        Ok(())
    }

    pub fn get_data(&self) -> &SharedTable {
        &self.data
    }

    pub fn read(&self) -> Result<Table> {
        self.data.read()
    }

    /// Variables being conditioned on.
    pub fn get_givens(&self) -> &[String] {
        &self.givens
    }

    /// Variables on the left side of the bar.
    pub fn get_outcomes(&self) -> &[String] {
        &self.outcomes
    }

    /// The outcome, when there is exactly one.
    pub fn outcome(&self) -> Option<&str> {
        match self.outcomes.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Whether the weights for every assignment of the givens sum to one within `tolerance`.
    pub fn check_normalized(&self, tolerance: f64) -> Result<bool> {
        let table = self.read()?;
        let key_indices = table.indices_of(&self.givens)?;
        let weights = table.weights()?;

        let mut totals: HashMap<Vec<Value>, f64> = HashMap::new();
        for (row, weight) in table.rows().iter().zip(weights) {
            let key: Vec<Value> = key_indices.iter().map(|k| row[*k].clone()).collect();
            *totals.entry(key).or_insert(0.0) += weight;
        }
        Ok(totals.values().all(|total| (total - 1.0).abs() <= tolerance))
    }
}

impl std::fmt::Display for ConditionalProbabilityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConditionalProbabilityTable(P({} | {}))",
            self.outcomes.join(", "),
            self.givens.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn data(columns: &[&str], rows: Vec<Row>) -> SharedTable {
        Storage::in_memory()
            .create(Table::from_rows(columns, rows).unwrap())
            .unwrap()
    }

    #[test]
    fn test_missing_value_column() {
        let result = ConditionalProbabilityTable::new(
            data(&["X", "count"], vec![row![0, 1.0]]),
            &["X"],
            &[],
        );
        assert!(matches!(result, Err(FactorError::MissingValueColumn)));
    }

    #[test]
    fn test_given_without_column() {
        let result = ConditionalProbabilityTable::new(
            data(&["Z", "value"], vec![row![0, 1.0]]),
            &["Z"],
            &["X"],
        );
        match result {
            Err(FactorError::ColumnMismatch { missing, .. }) => {
                assert_eq!(missing, vec!["X".to_string()])
            }
            other => panic!("expected a column mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_columns_allowed() {
        let cpt = ConditionalProbabilityTable::new(
            data(&["X", "Z", "note", "value"], vec![row![0, 1, "a", 1.0]]),
            &["Z"],
            &["X"],
        )
        .unwrap();
        assert_eq!(cpt.get_givens(), &["X".to_string()]);
        assert_eq!(cpt.outcome(), Some("Z"));
    }

    #[test]
    fn test_empty_outcomes() {
        let result = ConditionalProbabilityTable::new(
            data(&["X", "value"], vec![row![0, 1.0]]),
            &[],
            &["X"],
        );
        assert!(matches!(result, Err(FactorError::EmptyOutcomes)));
    }

    #[test]
    fn test_outcome_requires_single() {
        let cpt = ConditionalProbabilityTable::new(
            data(&["X", "Y", "value"], vec![row![0, 0, 1.0]]),
            &["X", "Y"],
            &[],
        )
        .unwrap();
        assert_eq!(cpt.outcome(), None);
        assert_eq!(cpt.get_outcomes().len(), 2);
    }

    #[test]
    fn test_prior_and_normalization_check() {
        let storage = Storage::in_memory();
        let prior = ConditionalProbabilityTable::prior(
            &storage,
            "X",
            &[(Value::from(0), 0.7), (Value::from(1), 0.3)],
        )
        .unwrap();
        assert!(prior.get_givens().is_empty());
        assert!(prior.check_normalized(1e-9).unwrap());

        let conditional = ConditionalProbabilityTable::new(
            data(
                &["X", "Z", "value"],
                vec![row![0, 0, 0.4], row![0, 1, 0.6], row![1, 0, 0.9], row![1, 1, 0.3]],
            ),
            &["Z"],
            &["X"],
        )
        .unwrap();
        assert!(!conditional.check_normalized(0.01).unwrap());
        assert!(conditional.check_normalized(0.25).unwrap());
    }
}
