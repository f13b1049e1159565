use anyhow::{Result, bail};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::binary_cpt;
use crate::common::interface::ScenarioMaker;
use crate::common::resources::ResourceContext;
use crate::network::BayesianNetwork;

/// Binary chain X0 -> X1 -> ... with probabilities drawn from a seeded generator.
pub struct RandomChain {
    pub length: usize,
    pub seed: u64,
}

impl RandomChain {
    pub fn variable(index: usize) -> String {
        format!("X{}", index)
    }
}

impl ScenarioMaker for RandomChain {
    fn setup_scenario(&self, resources: &ResourceContext) -> Result<BayesianNetwork> {
        if self.length == 0 {
            bail!("random chain needs at least one variable");
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let storage = &resources.storage;
        let mut network = BayesianNetwork::new();

        let root = Self::variable(0);
        network.add_prior(binary_cpt(storage, &root, &[], &[rng.gen_range(0.05..0.95)])?)?;
        for index in 1..self.length {
            let parent = Self::variable(index - 1);
            let child = Self::variable(index);
            let p_true = [rng.gen_range(0.05..0.95), rng.gen_range(0.05..0.95)];
            debug!("{} -> {} with P({}=1 | {}) = {:?}", parent, child, child, parent, p_true);
            network.add_cpt(binary_cpt(storage, &child, &[parent.as_str()], &p_true)?)?;
        }
        Ok(network)
    }
}
