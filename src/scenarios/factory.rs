use anyhow::{Result, anyhow};
use std::rc::Rc;

use super::{collider::Collider, independent_priors::IndependentPriors, random_chain::RandomChain};
use crate::common::interface::ScenarioMaker;
use crate::common::setup::CommandLineOptions;

pub struct ScenarioMakerFactory;

impl ScenarioMakerFactory {
    pub fn new_shared(name: &str, options: &CommandLineOptions) -> Result<Rc<dyn ScenarioMaker>> {
        match name {
            "independent_priors" => Ok(Rc::new(IndependentPriors {})),
            "collider" => Ok(Rc::new(Collider {})),
            "random_chain" => Ok(Rc::new(RandomChain {
                length: options.chain_length,
                seed: options.seed,
            })),
            _ => Err(anyhow!("Unknown ScenarioMaker type '{}'", name)),
        }
    }
}
