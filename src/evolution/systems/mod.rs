//! Simulation systems

mod cells;
mod diplomacy;
pub mod disasters;
mod generation;
pub mod incidents;
mod influence;
pub mod lifecycle;
mod research;
mod scheduling;

pub use cells::{
    aggregate_cell_attributes, calculate_civilization_resources, distribute_civ_attributes_to_cells,
    territory_centroid, update_cell_attributes,
};
pub use diplomacy::{apply_weak_alliance, update_relations};
pub use disasters::update_disasters;
pub use generation::seed_civilizations;
pub use incidents::generate_random_event;
pub use influence::{allocate_territory, calculate_influence, spread_influence};
pub use lifecycle::run_lifecycle;
pub use research::advance_research;
