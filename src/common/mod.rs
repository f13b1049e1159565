pub mod errors;
pub mod interface;
pub mod logging;
pub mod resources;
pub mod setup;

pub use errors::{FactorError, Result};
pub use interface::ScenarioMaker;
pub use resources::ResourceContext;
pub use setup::{CommandLineOptions, StorageType};
