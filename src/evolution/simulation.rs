//! Simulator - the owned world state and the per-tick pipeline

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::CivId;
use crate::evolution::civilization::{Civilization, DeadCivilization};
use crate::evolution::events::EventLog;
use crate::evolution::map::WorldMap;
use crate::evolution::systems;
use crate::evolution::systems::disasters::ActiveDisaster;
use crate::evolution::tech::{TechSystem, TechTree};

/// Years advanced per tick
pub const YEARS_PER_TICK: i32 = 10;
/// Influence, territory, disasters and lifecycle run when the year is a multiple of this
pub const FULL_UPDATE_PERIOD: i32 = 20;

/// What one call to `evolve` did
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub year: i32,
    pub full_update: bool,
    pub events_logged: u32,
    pub civilizations: usize,
}

/// The whole simulation state
pub struct Simulator {
    pub config: SimulationConfig,
    pub map: WorldMap,
    /// Live civilizations in founding order
    pub civilizations: Vec<Civilization>,
    pub dead_civilizations: Vec<DeadCivilization>,
    pub disasters: Vec<ActiveDisaster>,
    pub events: EventLog,
    pub year: i32,
    pub tech: TechSystem,
    /// Random number generator (deterministic for a given seed)
    pub rng: ChaCha8Rng,
    next_civ_id: u32,
    next_disaster_id: u32,
}

impl Simulator {
    /// Generate a map, seed civilizations and run the initial settlement pass
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let map = WorldMap::generate(config.map.cols, config.map.rows, &mut rng);
        let mut sim = Self::from_parts(config, map, Vec::new(), rng);

        systems::seed_civilizations(&mut sim);
        systems::distribute_civ_attributes_to_cells(&mut sim);
        systems::update_cell_attributes(&mut sim);
        systems::generate_random_event(&mut sim);

        tracing::info!(
            "Simulation ready: {}x{} map, {} civilizations, year {}",
            sim.map.cols,
            sim.map.rows,
            sim.civilizations.len(),
            sim.year
        );
        Ok(sim)
    }

    /// Assemble a simulator around prepared state; no generation is performed
    pub fn from_parts(
        config: SimulationConfig,
        map: WorldMap,
        civilizations: Vec<Civilization>,
        rng: ChaCha8Rng,
    ) -> Self {
        let next_civ_id = civilizations.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        Self {
            events: EventLog::with_capacity(config.event_log_capacity),
            year: config.start_year,
            config,
            map,
            civilizations,
            dead_civilizations: Vec::new(),
            disasters: Vec::new(),
            tech: TechSystem::default(),
            rng,
            next_civ_id,
            next_disaster_id: 1,
        }
    }

    /// Attach a technology catalog
    pub fn with_tech_tree(mut self, tree: TechTree) -> Self {
        self.tech = TechSystem::new(tree);
        self
    }

    /// Generate a new unique CivId
    pub fn next_civ_id(&mut self) -> CivId {
        let id = CivId(self.next_civ_id);
        self.next_civ_id += 1;
        id
    }

    pub fn next_disaster_id(&mut self) -> u32 {
        let id = self.next_disaster_id;
        self.next_disaster_id += 1;
        id
    }

    pub fn civ(&self, id: CivId) -> Option<&Civilization> {
        self.civilizations.iter().find(|c| c.id == id)
    }

    pub fn civ_mut(&mut self, id: CivId) -> Option<&mut Civilization> {
        self.civilizations.iter_mut().find(|c| c.id == id)
    }

    pub fn relation(&self, a: CivId, b: CivId) -> f64 {
        self.civ(a).map(|c| c.relation_with(b)).unwrap_or(0.0)
    }

    /// Write a relation on both sides, clamped to [-100, 100]
    pub fn set_relation(&mut self, a: CivId, b: CivId, value: f64) {
        if a == b {
            return;
        }
        let value = value.clamp(-100.0, 100.0);
        if let Some(civ) = self.civ_mut(a) {
            civ.relations.insert(b, value);
        }
        if let Some(civ) = self.civ_mut(b) {
            civ.relations.insert(a, value);
        }
    }

    pub fn adjust_relation(&mut self, a: CivId, b: CivId, delta: f64) {
        let current = self.relation(a, b);
        self.set_relation(a, b, current + delta);
    }

    /// Remove a civilization and every relation pointing at it
    pub fn remove_civilization(&mut self, id: CivId) -> Option<Civilization> {
        let index = self.civilizations.iter().position(|c| c.id == id)?;
        let civ = self.civilizations.remove(index);
        for other in &mut self.civilizations {
            other.relations.remove(&id);
        }
        Some(civ)
    }

    /// Recompute influence and reallocate territory
    pub fn recompute_territory(&mut self) {
        systems::calculate_influence(self);
        systems::allocate_territory(&mut self.map);
    }

    /// Advance one tick (10 years)
    pub fn evolve(&mut self) -> TickReport {
        let logged_before = self.events.total_logged();
        self.year += YEARS_PER_TICK;
        let full_update = self.year % FULL_UPDATE_PERIOD == 0;

        for civ in &mut self.civilizations {
            civ.update_stats(&mut self.rng);
        }
        for civ in &self.civilizations {
            civ.schedule_resources(&mut self.map, &mut self.rng);
        }

        if full_update {
            systems::update_disasters(self);
            self.recompute_territory();
            systems::distribute_civ_attributes_to_cells(self);
        }

        systems::update_cell_attributes(self);
        systems::aggregate_cell_attributes(self);

        if full_update {
            systems::advance_research(self);
            systems::update_relations(self);
            systems::run_lifecycle(self);
            systems::generate_random_event(self);
        }

        let report = TickReport {
            year: self.year,
            full_update,
            events_logged: self.events.total_logged() - logged_before,
            civilizations: self.civilizations.len(),
        };
        if full_update {
            tracing::debug!(
                "Year {}: {} civilizations, {} new events",
                report.year,
                report.civilizations,
                report.events_logged
            );
        }
        report
    }

    /// Evolve `ticks` times
    pub fn run(&mut self, ticks: usize) -> Vec<TickReport> {
        (0..ticks).map(|_| self.evolve()).collect()
    }
}
