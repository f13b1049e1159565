//! JSON description of a Bayesian network.
//!
//! ```json
//! {
//!   "priors": { "X": [[0, 0.5], [1, 0.5]] },
//!   "cpts": [
//!     { "outcome": "Z", "givens": ["X"],
//!       "rows": [{ "X": 0, "Z": 0, "value": 0.9 }, { "X": 0, "Z": 1, "value": 0.1 }] }
//!   ]
//! }
//! ```

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bayesian_network::BayesianNetwork;
use super::cpt::ConditionalProbabilityTable;
use crate::common::errors::{FactorError, Result};
use crate::table::backend::Storage;
use crate::table::models::{Row, Table, VALUE_COLUMN, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDocument {
    #[serde(default)]
    pub priors: BTreeMap<String, Vec<(Value, f64)>>,
    #[serde(default)]
    pub cpts: Vec<CptDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CptDocument {
    pub outcome: String,
    #[serde(default)]
    pub givens: Vec<String>,
    pub rows: Vec<BTreeMap<String, Value>>,
}

impl CptDocument {
    /// Columns are the givens, then the outcome, then `value`. Every row must name all of them.
    fn to_table(&self) -> Result<Table> {
        let mut columns = self.givens.clone();
        columns.push(self.outcome.clone());
        columns.push(VALUE_COLUMN.to_string());

        let mut table = Table::new(columns.as_slice())?;
        for record in &self.rows {
            let missing: Vec<String> = columns
                .iter()
                .filter(|c| !record.contains_key(*c))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(FactorError::ColumnMismatch {
                    columns: record.keys().cloned().collect(),
                    missing,
                });
            }
            let row: Row = columns.iter().map(|c| record[c].clone()).collect();
            table.push(row)?;
        }
        Ok(table)
    }
}

impl NetworkDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Register every CPT, then every prior, creating each table through `storage`.
    pub fn into_network(&self, storage: &Storage) -> Result<BayesianNetwork> {
        let mut network = BayesianNetwork::new();
        self.load_into(&mut network, storage)?;
        Ok(network)
    }

    pub fn load_into(&self, network: &mut BayesianNetwork, storage: &Storage) -> Result<()> {
        for cpt in &self.cpts {
            let data = storage.create(cpt.to_table()?)?;
            network.add_cpt(ConditionalProbabilityTable::new(
                data,
                std::slice::from_ref(&cpt.outcome),
                cpt.givens.as_slice(),
            )?)?;
        }
        network.set_priors(&self.priors, storage)?;
        info!(
            "loaded network document with {} CPTs and {} priors",
            self.cpts.len(),
            self.priors.len()
        );
        Ok(())
    }
}
