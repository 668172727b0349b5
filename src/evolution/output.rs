//! Read-only views and serializable snapshots for presentation layers

use serde::{Deserialize, Serialize};

use crate::core::types::{Attributes, CivId, GridPos};
use crate::evolution::civilization::{CivType, Civilization, DeadCivilization, Strategy};
use crate::evolution::events::{Event, EventLog, EventType};
use crate::evolution::map::{Terrain, WorldMap};
use crate::evolution::resource::{Resource, ResourceTally};
use crate::evolution::simulation::Simulator;
use crate::evolution::systems::{calculate_civilization_resources, territory_centroid};
use crate::evolution::tech::TechSummary;

/// Everything a UI may read; nothing here mutates the simulation
pub trait SimulationView {
    fn year(&self) -> i32;
    fn civilizations(&self) -> &[Civilization];
    fn dead_civilizations(&self) -> &[DeadCivilization];
    fn map(&self) -> &WorldMap;
    fn events(&self) -> &EventLog;
    fn relation(&self, a: CivId, b: CivId) -> f64;
    fn relation_matrix(&self) -> RelationMatrix;
    fn civilization_resources(&self, id: CivId) -> ResourceTally;
    fn cell_tooltip(&self, x: usize, y: usize) -> Option<CellTooltip>;
}

impl SimulationView for Simulator {
    fn year(&self) -> i32 {
        self.year
    }

    fn civilizations(&self) -> &[Civilization] {
        &self.civilizations
    }

    fn dead_civilizations(&self) -> &[DeadCivilization] {
        &self.dead_civilizations
    }

    fn map(&self) -> &WorldMap {
        &self.map
    }

    fn events(&self) -> &EventLog {
        &self.events
    }

    fn relation(&self, a: CivId, b: CivId) -> f64 {
        Simulator::relation(self, a, b)
    }

    fn relation_matrix(&self) -> RelationMatrix {
        let ids: Vec<CivId> = self.civilizations.iter().map(|c| c.id).collect();
        let values = self
            .civilizations
            .iter()
            .map(|row| {
                ids.iter()
                    .map(|&col| (col != row.id).then(|| row.relation_with(col)))
                    .collect()
            })
            .collect();
        RelationMatrix {
            names: self.civilizations.iter().map(|c| c.name.clone()).collect(),
            ids,
            values,
        }
    }

    fn civilization_resources(&self, id: CivId) -> ResourceTally {
        calculate_civilization_resources(&self.map, id)
    }

    fn cell_tooltip(&self, x: usize, y: usize) -> Option<CellTooltip> {
        let cell = self.map.get(x, y)?;
        Some(CellTooltip {
            position: GridPos::new(x, y),
            terrain: cell.terrain,
            terrain_name: cell.terrain.name().to_string(),
            resource: cell.resource,
            owner: cell.owner,
            owner_name: cell.owner.and_then(|id| self.civ(id)).map(|c| c.name.clone()),
            disputed: cell.disputed,
            attributes: cell.attributes,
            limits: cell.limits,
            power_intensity_percent: (cell.power_intensity() * 100.0).round() as u32,
        })
    }
}

/// Pairwise relations in founding order; the diagonal is empty
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationMatrix {
    pub ids: Vec<CivId>,
    pub names: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CellTooltip {
    pub position: GridPos,
    pub terrain: Terrain,
    pub terrain_name: String,
    pub resource: Option<Resource>,
    pub owner: Option<CivId>,
    pub owner_name: Option<String>,
    pub disputed: bool,
    pub attributes: Attributes,
    pub limits: Attributes,
    pub power_intensity_percent: u32,
}

/// Per-civilization panel data
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CivilizationSummary {
    pub id: CivId,
    pub name: String,
    pub civ_type: CivType,
    pub strategy: Strategy,
    pub attributes: Attributes,
    pub total_power: f64,
    pub stability: f64,
    pub is_declining: bool,
    pub is_unstable: bool,
    pub resources: ResourceTally,
    pub cells: usize,
    pub disputed_cells: usize,
    pub center: Option<GridPos>,
    /// Absent when no technology catalog is loaded
    pub research: Option<TechSummary>,
}

/// Complete serializable state for a UI frame or a final report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub year: i32,
    pub year_label: String,
    pub civilizations: Vec<CivilizationSummary>,
    pub dead_civilizations: Vec<DeadCivilization>,
    pub events: Vec<Event>,
    pub relations: RelationMatrix,
    pub cols: usize,
    pub rows: usize,
    /// Row-major terrain grid
    pub terrain: Vec<Terrain>,
    /// Row-major owner grid
    pub owners: Vec<Option<CivId>>,
}

impl SimulationSnapshot {
    pub fn capture(sim: &Simulator) -> Self {
        let civilizations = sim
            .civilizations
            .iter()
            .map(|civ| {
                let stats = sim.map.cell_stats(civ.id);
                CivilizationSummary {
                    id: civ.id,
                    name: civ.name.clone(),
                    civ_type: civ.civ_type,
                    strategy: civ.strategy,
                    attributes: civ.attributes,
                    total_power: civ.total_power(),
                    stability: civ.stability,
                    is_declining: civ.is_declining,
                    is_unstable: civ.is_unstable,
                    resources: calculate_civilization_resources(&sim.map, civ.id),
                    cells: stats.total_cells,
                    disputed_cells: stats.disputed_cells,
                    center: territory_centroid(&sim.map, civ.id),
                    research: (!sim.tech.is_empty()).then(|| sim.tech.summary(civ)),
                }
            })
            .collect();

        Self {
            year: sim.year,
            year_label: format_year(sim.year),
            civilizations,
            dead_civilizations: sim.dead_civilizations.clone(),
            events: sim.events.iter().cloned().collect(),
            relations: sim.relation_matrix(),
            cols: sim.map.cols,
            rows: sim.map.rows,
            terrain: sim.map.cells.iter().map(|c| c.terrain).collect(),
            owners: sim.map.cells.iter().map(|c| c.owner).collect(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        let wars = self
            .events
            .iter()
            .filter(|e| matches!(e.event_type, EventType::War { .. }))
            .count();
        let leader = self
            .civilizations
            .iter()
            .max_by(|a, b| a.total_power.total_cmp(&b.total_power))
            .map(|c| format!("{} ({:.0})", c.name, c.total_power))
            .unwrap_or_else(|| "none".to_string());
        format!(
            "{}: {} civilizations, {} fallen, {} recent wars, strongest {}",
            self.year_label,
            self.civilizations.len(),
            self.dead_civilizations.len(),
            wars,
            leader,
        )
    }
}

/// "3000 BC" for negative years, "250 AD" otherwise
pub fn format_year(year: i32) -> String {
    if year < 0 {
        format!("{} BC", year.unsigned_abs())
    } else {
        format!("{} AD", year)
    }
}
