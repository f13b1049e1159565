use anyhow::Result;
use std::collections::BTreeMap;

use crate::common::interface::ScenarioMaker;
use crate::common::resources::ResourceContext;
use crate::network::BayesianNetwork;
use crate::table::models::Value;

/// Two unconnected binary variables, P(X) = [0.7, 0.3] and P(Y) = [0.4, 0.6].
pub struct IndependentPriors {}

impl ScenarioMaker for IndependentPriors {
    fn setup_scenario(&self, resources: &ResourceContext) -> Result<BayesianNetwork> {
        let priors = BTreeMap::from([
            (
                "X".to_string(),
                vec![(Value::from(0), 0.7), (Value::from(1), 0.3)],
            ),
            (
                "Y".to_string(),
                vec![(Value::from(0), 0.4), (Value::from(1), 0.6)],
            ),
        ]);
        let mut network = BayesianNetwork::new();
        network.set_priors(&priors, &resources.storage)?;
        Ok(network)
    }
}
