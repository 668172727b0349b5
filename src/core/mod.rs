pub mod config;
pub mod error;
pub mod types;

pub use config::{SimulationConfig, SimulationSpeed};
pub use error::{Result, SimError};
pub use types::{Attribute, Attributes, CivId, GridPos};
