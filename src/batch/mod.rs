/// Sequential and parallel batch runs
pub mod executor;
/// Configuration, stats and results
pub mod types;

pub use executor::*;
pub use types::*;
