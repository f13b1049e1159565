use log::{trace, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::query::Query;
use super::stable::log_sum_exp;
use crate::common::errors::{FactorError, Result};
use crate::table::backend::SharedTable;
use crate::table::models::{Row, Table, VALUE_COLUMN, Value};

/// A factor whose `value` column holds the natural log of each weight.
///
/// Products and quotients become sums and differences, which keeps long chains of small
/// probabilities away from underflow. Every operation writes its result into a new table
/// derived from this factor's backend.
#[derive(Debug, Clone)]
pub struct LogFactor {
    data: SharedTable,
    variables: Vec<String>,
}

impl LogFactor {
    /// Wrap a backend whose table already holds log weights.
    pub fn new(data: SharedTable) -> Result<Self> {
        let table = data.read()?;
        table.value_index()?;
        let variables = table.variables();
        Ok(LogFactor { data, variables })
    }

    pub fn get_data(&self) -> &SharedTable {
        &self.data
    }

    /// Current contents of the backing table.
    pub fn read(&self) -> Result<Table> {
        self.data.read()
    }

    /// Column names other than `value`.
    pub fn get_variables(&self) -> BTreeSet<String> {
        self.variables.iter().cloned().collect()
    }

    /// Variables in column order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn has_variable(&self, variable: &str) -> bool {
        self.variables.iter().any(|v| v == variable)
    }

    /// True when both factors share the same backing table.
    pub fn same_as(&self, other: &LogFactor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Log-space product: join on the shared variables and add log weights.
    pub fn add(&self, other: &LogFactor) -> Result<LogFactor> {
        self.join(other, |left, right| left + right)
    }

    /// Log-space quotient: join on the shared variables and subtract log weights.
    pub fn subtract(&self, other: &LogFactor) -> Result<LogFactor> {
        self.join(other, |left, right| left - right)
    }

    /// Equi-join on every shared variable at once. With no shared variables this is the
    /// Cartesian product.
    fn join<F>(&self, other: &LogFactor, combine: F) -> Result<LogFactor>
    where
        F: Fn(f64, f64) -> f64,
    {
        let left = self.read()?;
        let right = other.read()?;

        let common: Vec<&String> = self
            .variables
            .iter()
            .filter(|v| other.has_variable(v))
            .collect();
        let left_keys = left.indices_of(&common)?;
        let right_keys = right.indices_of(&common)?;

        for (variable, (l, r)) in common.iter().zip(left_keys.iter().zip(&right_keys)) {
            for left_kind in left.column_kinds(*l) {
                for right_kind in right.column_kinds(*r) {
                    if !left_kind.compatible_with(right_kind) {
                        return Err(FactorError::JoinTypeMismatch {
                            variable: variable.to_string(),
                            left: left_kind,
                            right: right_kind,
                        });
                    }
                }
            }
        }

        let right_only: Vec<&String> = other
            .variables
            .iter()
            .filter(|v| !self.has_variable(v))
            .collect();
        let right_extra = right.indices_of(&right_only)?;
        let left_vars = left.indices_of(&self.variables)?;

        let mut columns: Vec<String> = self.variables.clone();
        columns.extend(right_only.iter().map(|v| v.to_string()));
        columns.push(VALUE_COLUMN.to_string());

        let left_weights = left.weights()?;
        let right_weights = right.weights()?;

        let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for (j, row) in right.rows().iter().enumerate() {
            let key: Vec<Value> = right_keys.iter().map(|k| row[*k].clone()).collect();
            index.entry(key).or_default().push(j);
        }

        let mut rows: Vec<Row> = Vec::new();
        for (i, row) in left.rows().iter().enumerate() {
            let key: Vec<Value> = left_keys.iter().map(|k| row[*k].clone()).collect();
            let Some(matches) = index.get(&key) else {
                continue;
            };
            for j in matches {
                let right_row = &right.rows()[*j];
                let mut joined: Row = left_vars.iter().map(|k| row[*k].clone()).collect();
                joined.extend(right_extra.iter().map(|k| right_row[*k].clone()));
                joined.push(Value::Float(combine(left_weights[i], right_weights[*j])));
                rows.push(joined);
            }
        }

        if rows.is_empty() && !left.is_empty() && !right.is_empty() {
            warn!(
                "join of {:?} and {:?} on {:?} produced no rows",
                self.variables, other.variables, common
            );
        }
        trace!(
            "joined {} x {} rows on {:?} into {} rows",
            left.len(),
            right.len(),
            common,
            rows.len()
        );

        self.derive(Table::from_parts_unchecked(columns, rows))
    }

    /// Marginalize `variable` out. Rows sharing the remaining variables collapse into one
    /// whose log weight is the log-sum-exp of the group.
    pub fn sum(&self, variable: &str) -> Result<LogFactor> {
        if !self.has_variable(variable) {
            return Err(FactorError::UnknownVariable(variable.to_string()));
        }
        let table = self.read()?;
        let remaining: Vec<String> = self
            .variables
            .iter()
            .filter(|v| v.as_str() != variable)
            .cloned()
            .collect();
        let key_indices = table.indices_of(&remaining)?;
        let weights = table.weights()?;

        let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, Vec<f64>)> = Vec::new();
        for (row, weight) in table.rows().iter().zip(weights) {
            let key: Vec<Value> = key_indices.iter().map(|k| row[*k].clone()).collect();
            match positions.get(&key) {
                Some(position) => groups[*position].1.push(weight),
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push((key, vec![weight]));
                }
            }
        }

        let rows: Vec<Row> = groups
            .into_iter()
            .map(|(mut key, members)| {
                key.push(Value::Float(log_sum_exp(&members)));
                key
            })
            .collect();

        let mut columns = remaining;
        columns.push(VALUE_COLUMN.to_string());
        trace!("summed out '{}' leaving {} rows", variable, rows.len());
        self.derive(Table::from_parts_unchecked(columns, rows))
    }

    /// Keep the rows satisfying every predicate of `query`.
    pub fn filter(&self, query: &Query) -> Result<LogFactor> {
        let table = self.read()?;
        let mut checks = Vec::with_capacity(query.filters().len());
        for filter in query.filters() {
            if !self.has_variable(&filter.variable) {
                return Err(FactorError::UnknownVariable(filter.variable.clone()));
            }
            let index = table.indices_of(&[filter.variable.as_str()])?[0];
            checks.push((index, &filter.predicate));
        }

        let rows: Vec<Row> = table
            .rows()
            .iter()
            .filter(|row| checks.iter().all(|(i, predicate)| predicate.matches(&row[*i])))
            .cloned()
            .collect();
        trace!("filter kept {} of {} rows", rows.len(), table.len());
        self.derive(Table::from_parts_unchecked(table.columns().to_vec(), rows))
    }

    /// Persist `table` next to this factor's data and wrap it.
    pub(crate) fn derive(&self, table: Table) -> Result<LogFactor> {
        let variables = table.variables();
        let data = self.data.derive(table)?;
        Ok(LogFactor { data, variables })
    }
}

impl std::fmt::Display for LogFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LogFactor({})", self.variables.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::table::backend::InMemoryTable;

    fn log_factor(columns: &[&str], rows: Vec<Row>) -> LogFactor {
        let table = Table::from_rows(columns, rows)
            .unwrap()
            .map_weights(|_, w| Ok(w.ln()))
            .unwrap();
        LogFactor::new(InMemoryTable::shared(table, None)).unwrap()
    }

    fn linear(factor: &LogFactor, assignment: &[(&str, i32)]) -> f64 {
        let assignment: Vec<(&str, Value)> =
            assignment.iter().map(|(k, v)| (*k, Value::from(*v))).collect();
        factor
            .read()
            .unwrap()
            .weight_where(&assignment)
            .unwrap()
            .exp()
    }

    #[test]
    fn test_log_factor_add() {
        let xy = log_factor(
            &["x", "y", "value"],
            vec![row![0, 0, 0.5], row![0, 1, 0.6], row![1, 0, 0.8], row![1, 1, 0.7]],
        );
        let x = log_factor(&["x", "value"], vec![row![0, 0.5], row![1, 0.2]]);

        let product = xy.add(&x).unwrap();
        assert_eq!(product.variables(), &["x".to_string(), "y".to_string()]);
        assert!((linear(&product, &[("x", 0), ("y", 0)]) - 0.25).abs() < 1e-9);
        assert!((linear(&product, &[("x", 0), ("y", 1)]) - 0.3).abs() < 1e-9);
        assert!((linear(&product, &[("x", 1), ("y", 0)]) - 0.16).abs() < 1e-9);
        assert!((linear(&product, &[("x", 1), ("y", 1)]) - 0.14).abs() < 1e-9);
    }

    #[test]
    fn test_log_factor_subtract() {
        let xy = log_factor(
            &["x", "y", "value"],
            vec![row![0, 0, 0.5], row![0, 1, 0.6], row![1, 0, 0.9], row![1, 1, 0.3]],
        );
        let x = log_factor(&["x", "value"], vec![row![0, 0.1], row![1, 0.3]]);

        let quotient = xy.subtract(&x).unwrap();
        assert!((linear(&quotient, &[("x", 0), ("y", 0)]) - 5.0).abs() < 1e-9);
        assert!((linear(&quotient, &[("x", 0), ("y", 1)]) - 6.0).abs() < 1e-9);
        assert!((linear(&quotient, &[("x", 1), ("y", 0)]) - 3.0).abs() < 1e-9);
        assert!((linear(&quotient, &[("x", 1), ("y", 1)]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_variables_give_cartesian_product() {
        let x = log_factor(&["x", "value"], vec![row![0, 0.5], row![1, 0.5]]);
        let y = log_factor(&["y", "value"], vec![row![0, 0.1], row![1, 0.2], row![2, 0.7]]);
        let product = x.add(&y).unwrap();
        assert_eq!(product.read().unwrap().len(), 6);
    }

    #[test]
    fn test_disjoint_values_give_empty_result() {
        let x = log_factor(&["x", "value"], vec![row![0, 0.5]]);
        let other = log_factor(&["x", "value"], vec![row![1, 0.5]]);
        let product = x.add(&other).unwrap();
        assert!(product.read().unwrap().is_empty());
        assert_eq!(product.variables(), &["x".to_string()]);
    }

    #[test]
    fn test_join_and_filter_agree_on_numeric_keys() {
        let big = (1i64 << 53) + 1;
        let ids = log_factor(&["id", "value"], vec![row![big, 0.5], row![3, 0.5]]);
        let floats = log_factor(
            &["id", "value"],
            vec![row![(1i64 << 53) as f64, 0.25], row![3.0, 0.25]],
        );

        let joined = ids.add(&floats).unwrap().read().unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.rows()[0][0], Value::Integer(3));

        let filtered = floats.filter(&Query::new().equals("id", big)).unwrap();
        assert!(filtered.read().unwrap().is_empty());
    }

    #[test]
    fn test_join_type_mismatch() {
        let x = log_factor(&["x", "value"], vec![row![0, 0.5]]);
        let text = log_factor(&["x", "value"], vec![row!["0", 0.5]]);
        let result = x.add(&text);
        assert!(matches!(
            result,
            Err(FactorError::JoinTypeMismatch { ref variable, .. }) if variable == "x"
        ));
    }

    #[test]
    fn test_sum_even_groupings() {
        let xy = log_factor(
            &["x", "y", "value"],
            vec![row![0, 0, 0.1], row![0, 1, 0.2], row![1, 0, 0.3], row![1, 1, 0.4]],
        );
        let marginal = xy.sum("x").unwrap();
        assert_eq!(marginal.variables(), &["y".to_string()]);
        assert!((linear(&marginal, &[("y", 0)]) - 0.4).abs() < 1e-9);
        assert!((linear(&marginal, &[("y", 1)]) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_sum_odd_and_uneven_groupings() {
        let xy = log_factor(
            &["x", "y", "value"],
            vec![
                row![0, 1, 0.2],
                row![0, 2, 0.2],
                row![1, 0, 0.3],
                row![1, 1, 0.4],
                row![1, 2, 0.1],
            ],
        );
        let marginal = xy.sum("y").unwrap();
        assert!((linear(&marginal, &[("x", 0)]) - 0.4).abs() < 1e-9);
        assert!((linear(&marginal, &[("x", 1)]) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_sum_single_row_groups_unchanged() {
        let xy = log_factor(&["x", "y", "value"], vec![row![0, 1, 0.2], row![1, 2, 0.1]]);
        let marginal = xy.sum("y").unwrap();
        assert!((linear(&marginal, &[("x", 0)]) - 0.2).abs() < 1e-12);
        assert!((linear(&marginal, &[("x", 1)]) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_sum_tiny_weights_stays_finite() {
        let table = Table::from_rows(
            &["x", "y", "value"],
            vec![row![0, 0, -2000.0], row![0, 1, -2000.0]],
        )
        .unwrap();
        let factor = LogFactor::new(InMemoryTable::shared(table, None)).unwrap();
        let marginal = factor.sum("y").unwrap().read().unwrap();
        let log_weight = marginal.weights().unwrap()[0];
        assert!((log_weight - (-2000.0 + 2f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn test_sum_last_variable_gives_scalar() {
        let x = log_factor(&["x", "value"], vec![row![0, 0.25], row![1, 0.5]]);
        let total = x.sum("x").unwrap();
        assert!(total.variables().is_empty());
        let table = total.read().unwrap();
        assert_eq!(table.len(), 1);
        assert!((table.weights().unwrap()[0].exp() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_sum_unknown_variable() {
        let x = log_factor(&["x", "value"], vec![row![0, 1.0]]);
        assert!(matches!(x.sum("z"), Err(FactorError::UnknownVariable(v)) if v == "z"));
    }

    #[test]
    fn test_filter() {
        let xy = log_factor(
            &["x", "y", "value"],
            vec![row![0, 0, 0.1], row![0, 1, 0.2], row![1, 0, 0.3], row![1, 1, 0.4]],
        );
        let filtered = xy.filter(&Query::new().equals("x", 1)).unwrap();
        assert_eq!(filtered.read().unwrap().len(), 2);
        assert_eq!(filtered.get_variables(), xy.get_variables());

        let none = xy
            .filter(&Query::new().equals("x", 1).one_of("y", [5, 6]))
            .unwrap();
        assert!(none.read().unwrap().is_empty());

        let by_fn = xy
            .filter(&Query::new().matching("y", |v| v.as_integer() == Some(1)))
            .unwrap();
        assert!((linear(&by_fn, &[("x", 1), ("y", 1)]) - 0.4).abs() < 1e-9);
        assert_eq!(by_fn.read().unwrap().len(), 2);

        assert!(xy.filter(&Query::new().equals("w", 0)).is_err());
    }

    #[test]
    fn test_missing_value_column() {
        let table = Table::from_rows(&["x"], vec![row![0]]).unwrap();
        let result = LogFactor::new(InMemoryTable::shared(table, None));
        assert!(matches!(result, Err(FactorError::MissingValueColumn)));
    }
}
