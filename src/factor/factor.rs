use log::debug;
use std::collections::{BTreeSet, HashMap};

use super::log_factor::LogFactor;
use super::query::Query;
use super::stable::{checked_ln, log_sum_exp};
use crate::common::errors::{FactorError, Result};
use crate::network::cpt::ConditionalProbabilityTable;
use crate::table::backend::SharedTable;
use crate::table::models::{Table, Value};

/// A factor in linear (probability) space, backed by a [`LogFactor`].
///
/// Reads exponentiate the backing log table on every call; nothing is cached.
#[derive(Debug, Clone)]
pub struct Factor {
    log_factor: LogFactor,
}

/// Collects the origin of a [`Factor`]. Exactly one of table, CPT or log factor must be
/// supplied.
#[derive(Debug, Default)]
pub struct FactorBuilder {
    table: Option<SharedTable>,
    cpt: Option<ConditionalProbabilityTable>,
    log_factor: Option<LogFactor>,
}

impl FactorBuilder {
    pub fn table(mut self, data: SharedTable) -> Self {
        self.table = Some(data);
        self
    }

    pub fn cpt(mut self, cpt: ConditionalProbabilityTable) -> Self {
        self.cpt = Some(cpt);
        self
    }

    pub fn log_factor(mut self, log_factor: LogFactor) -> Self {
        self.log_factor = Some(log_factor);
        self
    }

    pub fn build(self) -> Result<Factor> {
        match (self.table, self.cpt, self.log_factor) {
            (Some(data), None, None) => Factor::from_table(&data),
            (None, Some(cpt), None) => Factor::from_cpt(&cpt),
            (None, None, Some(log_factor)) => Ok(Factor::from_log_factor(log_factor)),
            (None, None, None) => Err(FactorError::MissingOrigin),
            _ => Err(FactorError::AmbiguousOrigin),
        }
    }
}

impl Factor {
    pub fn builder() -> FactorBuilder {
        FactorBuilder::default()
    }

    /// Factor over a table of linear weights. The log table is stored alongside `data`.
    pub fn from_table(data: &SharedTable) -> Result<Factor> {
        let table = data.read()?;
        let log_table = table.map_weights(|row, weight| {
            checked_ln(weight).ok_or_else(|| {
                if weight.is_nan() {
                    FactorError::NonNumericWeight {
                        row,
                        value: weight.to_string(),
                    }
                } else {
                    FactorError::NegativeWeight { row, weight }
                }
            })
        })?;
        let log_data = data.derive(log_table)?;
        Ok(Factor {
            log_factor: LogFactor::new(log_data)?,
        })
    }

    /// Factor over the CPT's table: an unnormalized potential over givens and outcomes.
    pub fn from_cpt(cpt: &ConditionalProbabilityTable) -> Result<Factor> {
        Factor::from_table(cpt.get_data())
    }

    pub fn from_log_factor(log_factor: LogFactor) -> Factor {
        Factor { log_factor }
    }

    pub fn log_factor(&self) -> &LogFactor {
        &self.log_factor
    }

    pub fn get_variables(&self) -> BTreeSet<String> {
        self.log_factor.get_variables()
    }

    pub fn variables(&self) -> &[String] {
        self.log_factor.variables()
    }

    pub fn has_variable(&self, variable: &str) -> bool {
        self.log_factor.has_variable(variable)
    }

    /// True when both handles share the same backing table.
    pub fn same_as(&self, other: &Factor) -> bool {
        self.log_factor.same_as(&other.log_factor)
    }

    pub fn prod(&self, other: &Factor) -> Result<Factor> {
        Ok(Factor::from_log_factor(self.log_factor.add(&other.log_factor)?))
    }

    pub fn div(&self, other: &Factor) -> Result<Factor> {
        Ok(Factor::from_log_factor(
            self.log_factor.subtract(&other.log_factor)?,
        ))
    }

    /// Sum `variable` out. Summing out the last variable leaves a factor with no variables
    /// and a single row holding the total.
    pub fn sum(&self, variable: &str) -> Result<Factor> {
        Ok(Factor::from_log_factor(self.log_factor.sum(variable)?))
    }

    /// Sum out each of `variables` in turn.
    pub fn sum_out<S: AsRef<str>>(&self, variables: &[S]) -> Result<Factor> {
        let mut factor = self.clone();
        for variable in variables {
            factor = factor.sum(variable.as_ref())?;
        }
        Ok(factor)
    }

    pub fn filter(&self, query: &Query) -> Result<Factor> {
        Ok(Factor::from_log_factor(self.log_factor.filter(query)?))
    }

    /// Divide every row by the total of the rows sharing its `variables` assignment, or by
    /// the grand total when `variables` is empty.
    pub fn normalize<S: AsRef<str>>(&self, variables: &[S]) -> Result<Factor> {
        for variable in variables {
            if !self.has_variable(variable.as_ref()) {
                return Err(FactorError::UnknownVariable(variable.as_ref().to_string()));
            }
        }
        let table = self.log_factor.read()?;
        let key_indices = table.indices_of(variables)?;
        let weights = table.weights()?;

        let mut groups: HashMap<Vec<Value>, Vec<f64>> = HashMap::new();
        let mut keys: Vec<Vec<Value>> = Vec::with_capacity(table.len());
        for (row, weight) in table.rows().iter().zip(&weights) {
            let key: Vec<Value> = key_indices.iter().map(|k| row[*k].clone()).collect();
            groups.entry(key.clone()).or_default().push(*weight);
            keys.push(key);
        }
        let totals: HashMap<Vec<Value>, f64> = groups
            .into_iter()
            .map(|(key, members)| (key, log_sum_exp(&members)))
            .collect();
        debug!(
            "normalizing {:?} over {} groups",
            self.variables(),
            totals.len()
        );

        let normalized = table.map_weights(|row, weight| Ok(weight - totals[&keys[row]]))?;
        Ok(Factor::from_log_factor(self.log_factor.derive(normalized)?))
    }

    /// The factor's table in linear space, freshly exponentiated from the log backend.
    pub fn get_df(&self) -> Result<Table> {
        self.log_factor
            .read()?
            .map_weights(|_, log_weight| Ok(log_weight.exp()))
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Factor({})", self.variables().join(", "))
    }
}

/// An ordered collection of factors.
#[derive(Debug, Clone, Default)]
pub struct Factors {
    factors: Vec<Factor>,
}

impl Factors {
    pub fn new(factors: Vec<Factor>) -> Self {
        Self { factors }
    }

    /// Product of every factor, left to right. `None` when empty.
    pub fn prod(&self) -> Result<Option<Factor>> {
        let mut iter = self.factors.iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut product = first.clone();
        for factor in iter {
            product = product.prod(factor)?;
        }
        Ok(Some(product))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Factor> {
        self.factors.iter()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn push(&mut self, factor: Factor) {
        self.factors.push(factor);
    }
}

impl FromIterator<Factor> for Factors {
    fn from_iter<I: IntoIterator<Item = Factor>>(iter: I) -> Self {
        Factors::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Factors {
    type Item = Factor;
    type IntoIter = std::vec::IntoIter<Factor>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.into_iter()
    }
}

impl<'a> IntoIterator for &'a Factors {
    type Item = &'a Factor;
    type IntoIter = std::slice::Iter<'a, Factor>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.iter()
    }
}
