//! Civilization Evolution
//!
//! Grid-world simulation of competing civilizations. Each tick advances ten
//! years; every second tick recomputes influence, territory, diplomacy and
//! the rise and fall of civilizations.

pub mod civilization;
pub mod events;
pub mod map;
pub mod output;
pub mod resource;
pub mod simulation;
pub mod systems;
pub mod tech;
pub mod ticker;

pub use civilization::{CivType, Civilization, DeadCivilization, Strategy};
pub use events::{Event, EventLog, EventType};
pub use map::{Terrain, TerritoryCell, WorldMap};
pub use output::{format_year, CellTooltip, SimulationSnapshot, SimulationView};
pub use resource::{Resource, ResourceTally, ResourceType};
pub use simulation::{Simulator, TickReport};
pub use tech::{TechSystem, TechTree};
pub use ticker::Ticker;
