use anyhow::Result;

use super::resources::ResourceContext;
use crate::network::BayesianNetwork;

/// Builds a named network, creating its tables through the context's storage.
pub trait ScenarioMaker {
    fn setup_scenario(&self, resources: &ResourceContext) -> Result<BayesianNetwork>;
}
