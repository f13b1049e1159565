pub mod bayesian_network;
pub mod cpt;
pub mod dag;
pub mod document;
pub mod markov_network;
pub mod sink;

pub use bayesian_network::BayesianNetwork;
pub use cpt::ConditionalProbabilityTable;
pub use dag::DirectedAcyclicGraph;
pub use document::{CptDocument, NetworkDocument};
pub use markov_network::MarkovNetwork;
pub use sink::{DotGraphSink, GraphSink, NullGraphSink};
