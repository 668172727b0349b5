//! Civ Evolution - grid-based civilization evolution simulator

pub mod core;
pub mod evolution;
