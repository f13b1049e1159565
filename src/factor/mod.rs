pub mod factor;
pub mod log_factor;
pub mod query;
pub mod stable;

pub use factor::{Factor, FactorBuilder, Factors};
pub use log_factor::LogFactor;
pub use query::{Filter, Predicate, Query};
