use anyhow::Result;

use super::binary_cpt;
use crate::common::interface::ScenarioMaker;
use crate::common::resources::ResourceContext;
use crate::network::BayesianNetwork;

/// X and Y both cause Z, which causes A.
pub struct Collider {}

impl ScenarioMaker for Collider {
    fn setup_scenario(&self, resources: &ResourceContext) -> Result<BayesianNetwork> {
        let storage = &resources.storage;
        let mut network = BayesianNetwork::new();
        network.add_cpt(binary_cpt(storage, "Z", &["X", "Y"], &[0.1, 0.6, 0.7, 0.95])?)?;
        network.add_cpt(binary_cpt(storage, "A", &["Z"], &[0.2, 0.9])?)?;
        network.add_prior(binary_cpt(storage, "X", &[], &[0.3])?)?;
        network.add_prior(binary_cpt(storage, "Y", &[], &[0.6])?)?;
        Ok(network)
    }
}
