use log::trace;
use std::collections::BTreeMap;

use crate::common::errors::{FactorError, Result};
use crate::factor::{Factor, Factors};

/// Undirected model: every factor is indexed under each variable it mentions. The lists
/// share factors rather than copying them.
#[derive(Debug, Clone, Default)]
pub struct MarkovNetwork {
    factors: BTreeMap<String, Vec<Factor>>,
    insertion_order: Vec<Factor>,
}

impl MarkovNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_factor(&mut self, factor: Factor) {
        for variable in factor.variables() {
            self.factors
                .entry(variable.clone())
                .or_default()
                .push(factor.clone());
        }
        if !factor.variables().is_empty()
            && !self.insertion_order.iter().any(|f| f.same_as(&factor))
        {
            trace!("added factor {}", factor);
            self.insertion_order.push(factor);
        }
    }

    /// Every factor once when `node` is `None`, otherwise the factors mentioning `node`.
    pub fn get_factors(&self, node: Option<&str>) -> Result<Factors> {
        match node {
            None => Ok(Factors::new(self.insertion_order.clone())),
            Some(node) => self
                .factors
                .get(node)
                .map(|factors| Factors::new(factors.clone()))
                .ok_or_else(|| FactorError::UnknownVariable(node.to_string())),
        }
    }

    pub fn get_variables(&self) -> Vec<String> {
        self.factors.keys().cloned().collect()
    }
}
