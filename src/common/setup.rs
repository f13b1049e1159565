use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, ValueEnum, builder::EnumValueParser};
use serde::Deserialize;

use super::logging::init_logging;

/// Where factor and CPT tables live.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, ValueEnum)]
pub enum StorageType {
    /// Tables held in process memory
    #[serde(rename = "in-memory")]
    InMemory,

    /// Tables stored in a SQLite file
    #[serde(rename = "persistent")]
    Persistent,
}

/// These options define the inputs from the user.
#[derive(Deserialize, Clone, Debug)]
pub struct CommandLineOptions {
    pub scenario_name: Option<String>,
    pub network_file: Option<String>,
    pub storage_type: StorageType,
    pub db_path: Option<String>,
    pub query: Vec<String>,
    pub dot_output: Option<String>,
    pub seed: u64,
    pub chain_length: usize,
}

pub fn build_command() -> Command {
    Command::new("BAYESFACTOR")
        .version("0.1")
        .about("Factor algebra over discrete Bayesian and Markov networks.")
        .arg(
            Arg::new("scenario_name")
                .long("scenario_name")
                .value_name("STRING")
                .help("Built-in network to construct")
                .required_unless_present("network_file"),
        )
        .arg(
            Arg::new("network_file")
                .long("network_file")
                .value_name("FILE")
                .help("JSON network document to load instead of a scenario"),
        )
        .arg(
            Arg::new("storage_type")
                .long("storage_type")
                .value_parser(EnumValueParser::<StorageType>::new())
                .help("Type of table storage to use: 'in-memory' or 'persistent'")
                .default_value("in-memory"),
        )
        .arg(
            Arg::new("db_path")
                .long("db_path")
                .value_name("PATH")
                .help("Path to SQLite database file (only used with persistent storage)"),
        )
        .arg(
            Arg::new("query")
                .long("query")
                .value_name("VARIABLE")
                .help("Variable whose marginal to print; repeat for several (default: all)")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("dot_output")
                .long("dot_output")
                .value_name("FILE")
                .help("Write a Graphviz rendering of the network to this file"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("NUMBER")
                .help("Random seed for generated scenarios")
                .default_value("0"),
        )
        .arg(
            Arg::new("chain_length")
                .long("chain_length")
                .value_name("NUMBER")
                .help("Number of variables in the random chain scenario")
                .default_value("5"),
        )
}

pub fn options_from_matches(matches: &ArgMatches) -> Result<CommandLineOptions> {
    let seed: u64 = matches
        .get_one::<String>("seed")
        .context("seed has a default value")?
        .parse()
        .context("seed needs to be a non-negative integer")?;
    let chain_length: usize = matches
        .get_one::<String>("chain_length")
        .context("chain_length has a default value")?
        .parse()
        .context("chain_length needs to be a non-negative integer")?;
    let storage_type = matches
        .get_one::<StorageType>("storage_type")
        .copied()
        .unwrap_or(StorageType::InMemory);
    let query = matches
        .get_many::<String>("query")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    Ok(CommandLineOptions {
        scenario_name: matches.get_one::<String>("scenario_name").cloned(),
        network_file: matches.get_one::<String>("network_file").cloned(),
        storage_type,
        db_path: matches.get_one::<String>("db_path").cloned(),
        query,
        dot_output: matches.get_one::<String>("dot_output").cloned(),
        seed,
        chain_length,
    })
}

/// Install logging and parse the process arguments.
pub fn parse_configuration_options() -> Result<CommandLineOptions> {
    init_logging();
    options_from_matches(&build_command().get_matches())
}
