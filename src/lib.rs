pub mod common;
pub mod factor;
pub mod network;
pub mod scenarios;
pub mod table;

pub use common::errors::{FactorError, Result};
pub use factor::{Factor, Factors, LogFactor, Query};
pub use network::{
    BayesianNetwork, ConditionalProbabilityTable, DirectedAcyclicGraph, MarkovNetwork,
    NetworkDocument,
};
pub use table::{Storage, Table, Value};
