use anyhow::{Context, Result, bail};
use bayesfactor::common::interface::ScenarioMaker;
use bayesfactor::common::resources::ResourceContext;
use bayesfactor::common::setup::parse_configuration_options;
use bayesfactor::network::{BayesianNetwork, DotGraphSink, GraphSink, NetworkDocument};
use bayesfactor::scenarios::ScenarioMakerFactory;
use bayesfactor::table::VALUE_COLUMN;
use log::info;
use std::fs;

fn main() -> Result<()> {
    let options = parse_configuration_options()?;
    let resources = ResourceContext::new(&options)?;

    let network: BayesianNetwork = match (&options.network_file, &options.scenario_name) {
        (Some(path), _) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read network file {}", path))?;
            NetworkDocument::from_json(&json)?.into_network(&resources.storage)?
        }
        (None, Some(name)) => {
            ScenarioMakerFactory::new_shared(name, &options)?.setup_scenario(&resources)?
        }
        (None, None) => bail!("either --scenario_name or --network_file is required"),
    };
    info!("built network with {} CPTs", network.len());

    if let Some(path) = &options.dot_output {
        let mut sink = DotGraphSink::new();
        network.replay_into(&mut sink);
        let dot = sink.render().unwrap_or_default();
        fs::write(path, dot).with_context(|| format!("failed to write {}", path))?;
        info!("wrote Graphviz rendering to {}", path);
    }

    let markov_network = network.to_markov_network()?;
    let joint = markov_network
        .get_factors(None)?
        .prod()?
        .context("network has no factors")?;

    let queries = if options.query.is_empty() {
        markov_network.get_variables()
    } else {
        options.query.clone()
    };

    for variable in &queries {
        if !joint.has_variable(variable) {
            bail!("unknown variable '{}'", variable);
        }
        let others: Vec<&String> = joint.variables().iter().filter(|v| *v != variable).collect();
        let marginal = joint.sum_out(others.as_slice())?.normalize::<&str>(&[])?;
        println!("P({})", variable);
        for record in marginal.get_df()?.records() {
            let probability = record
                .get(VALUE_COLUMN)
                .and_then(|v| v.as_float())
                .unwrap_or(f64::NAN);
            let assignment = record
                .get(variable.as_str())
                .map(|v| v.to_string())
                .unwrap_or_default();
            println!("  {} = {}: {:.4}", variable, assignment, probability);
        }
    }
    Ok(())
}
