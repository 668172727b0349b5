//! Natural disasters: spawning, lingering impact and recovery

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{Attribute, CivId, GridPos};
use crate::evolution::events::EventType;
use crate::evolution::map::Terrain;
use crate::evolution::simulation::Simulator;

const CENTER_ATTEMPTS: usize = 20;
const STRONG_CIV_BIAS: f64 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterKind {
    Flood,
    Earthquake,
    Drought,
    Plague,
    VolcanicEruption,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
    VeryHigh,
}

impl Severity {
    pub fn radius(&self) -> f64 {
        match self {
            Severity::Medium => 3.0,
            Severity::High => 5.0,
            Severity::VeryHigh => 7.0,
        }
    }
}

/// Static parameters of one disaster kind
pub struct DisasterProfile {
    /// Chance per full tick
    pub probability: f64,
    /// Full ticks the disaster lingers
    pub duration: u32,
    pub severity: Severity,
    /// Relative change applied at the centre, fading to zero at the radius
    pub impacts: &'static [(Attribute, f64)],
    pub terrains: &'static [Terrain],
}

const FLOOD: DisasterProfile = DisasterProfile {
    probability: 0.05,
    duration: 3,
    severity: Severity::Medium,
    impacts: &[(Attribute::Population, -0.2), (Attribute::Economy, -0.15), (Attribute::Tech, -0.05)],
    terrains: &[Terrain::Plains, Terrain::Water],
};

const EARTHQUAKE: DisasterProfile = DisasterProfile {
    probability: 0.03,
    duration: 2,
    severity: Severity::High,
    impacts: &[(Attribute::Population, -0.25), (Attribute::Economy, -0.2), (Attribute::Military, -0.1)],
    terrains: &[Terrain::Plains, Terrain::Hills, Terrain::Mountains],
};

const DROUGHT: DisasterProfile = DisasterProfile {
    probability: 0.04,
    duration: 5,
    severity: Severity::Medium,
    impacts: &[(Attribute::Population, -0.15), (Attribute::Economy, -0.1), (Attribute::Culture, -0.05)],
    terrains: &[Terrain::Plains, Terrain::Forest],
};

const PLAGUE: DisasterProfile = DisasterProfile {
    probability: 0.02,
    duration: 4,
    severity: Severity::High,
    impacts: &[(Attribute::Population, -0.3), (Attribute::Economy, -0.15), (Attribute::Culture, -0.1)],
    terrains: &[Terrain::Plains, Terrain::Forest, Terrain::Hills],
};

const VOLCANIC_ERUPTION: DisasterProfile = DisasterProfile {
    probability: 0.01,
    duration: 2,
    severity: Severity::VeryHigh,
    impacts: &[(Attribute::Population, -0.35), (Attribute::Economy, -0.25), (Attribute::Tech, -0.1)],
    terrains: &[Terrain::Mountains, Terrain::Hills, Terrain::Plains],
};

impl DisasterKind {
    pub const ALL: [DisasterKind; 5] = [
        DisasterKind::Flood,
        DisasterKind::Earthquake,
        DisasterKind::Drought,
        DisasterKind::Plague,
        DisasterKind::VolcanicEruption,
    ];

    pub fn profile(&self) -> &'static DisasterProfile {
        match self {
            DisasterKind::Flood => &FLOOD,
            DisasterKind::Earthquake => &EARTHQUAKE,
            DisasterKind::Drought => &DROUGHT,
            DisasterKind::Plague => &PLAGUE,
            DisasterKind::VolcanicEruption => &VOLCANIC_ERUPTION,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DisasterKind::Flood => "Flood",
            DisasterKind::Earthquake => "Earthquake",
            DisasterKind::Drought => "Drought",
            DisasterKind::Plague => "Plague",
            DisasterKind::VolcanicEruption => "Volcanic eruption",
        }
    }
}

/// A disaster still affecting the map
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActiveDisaster {
    pub id: u32,
    pub kind: DisasterKind,
    pub center: GridPos,
    pub radius: f64,
    pub remaining: u32,
    /// Cells within the radius on an affected terrain, fixed at spawn
    pub cells: Vec<GridPos>,
}

impl ActiveDisaster {
    /// Scale the attributes of every affected cell, strongest at the centre
    pub fn apply(&self, sim: &mut Simulator) {
        let impacts = self.kind.profile().impacts;
        for &pos in &self.cells {
            let falloff = (1.0 - pos.euclidean(&self.center) / self.radius).max(0.0);
            let cell = sim.map.cell_mut(pos);
            for &(attr, impact) in impacts {
                let v = (cell.attributes.get(attr) * (1.0 + impact * falloff)).max(0.0);
                cell.attributes.set(attr, v);
            }
        }
    }
}

/// Roll every disaster kind, then age the active ones
pub fn update_disasters(sim: &mut Simulator) {
    for kind in DisasterKind::ALL {
        if sim.rng.gen::<f64>() < kind.profile().probability {
            spawn_disaster(sim, kind);
        }
    }
    advance_disasters(sim);
}

/// Place a disaster, log it and apply its first impact
pub fn spawn_disaster(sim: &mut Simulator, kind: DisasterKind) -> u32 {
    let profile = kind.profile();
    let center = pick_center(sim, profile.terrains);
    let radius = profile.severity.radius();
    let cells = affected_cells(sim, center, radius, profile.terrains);

    let id = sim.next_disaster_id();
    let disaster = ActiveDisaster {
        id,
        kind,
        center,
        radius,
        remaining: profile.duration,
        cells,
    };

    let mut participants: Vec<CivId> = disaster
        .cells
        .iter()
        .filter_map(|&p| sim.map.cell(p).owner)
        .collect();
    participants.sort();
    participants.dedup();

    let year = sim.year;
    sim.events.add_event(
        EventType::Disaster {
            disaster_id: id,
            kind,
            radius,
            cells_affected: disaster.cells.len(),
        },
        year,
        format!("{} struck near ({}, {})", kind.name(), center.x, center.y),
        participants,
        Some(center),
    );

    disaster.apply(sim);
    sim.disasters.push(disaster);
    id
}

/// Decrement every active disaster; re-apply the lingering ones, retire the rest
pub fn advance_disasters(sim: &mut Simulator) {
    for i in (0..sim.disasters.len()).rev() {
        sim.disasters[i].remaining = sim.disasters[i].remaining.saturating_sub(1);
        if sim.disasters[i].remaining > 0 {
            let disaster = sim.disasters[i].clone();
            disaster.apply(sim);
        } else {
            let disaster = sim.disasters.remove(i);
            let year = sim.year;
            sim.events.add_event(
                EventType::DisasterEnd {
                    disaster_id: disaster.id,
                    kind: disaster.kind,
                },
                year,
                format!("The {} ended and the land began to recover", disaster.kind.name().to_lowercase()),
                Vec::new(),
                Some(disaster.center),
            );
        }
    }
}

/// Usually near one of the two strongest civilizations, on a terrain the disaster affects
fn pick_center(sim: &mut Simulator, terrains: &[Terrain]) -> GridPos {
    let (cols, rows) = (sim.map.cols, sim.map.rows);

    let mut ranked: Vec<(f64, GridPos)> = sim
        .civilizations
        .iter()
        .map(|c| (c.total_power(), c.position))
        .collect();
    ranked.sort_by_key(|&(power, _)| Reverse(OrderedFloat(power)));
    ranked.truncate(2);

    let anchor = if sim.rng.gen::<f64>() < STRONG_CIV_BIAS && !ranked.is_empty() {
        Some(ranked[sim.rng.gen_range(0..ranked.len())].1)
    } else {
        None
    };

    for _ in 0..CENTER_ATTEMPTS {
        let candidate = match anchor {
            Some(pos) => {
                let dx = (sim.rng.gen::<f64>() * 10.0).floor() as isize - 5;
                let dy = (sim.rng.gen::<f64>() * 10.0).floor() as isize - 5;
                GridPos::new(
                    (pos.x as isize + dx).clamp(0, cols as isize - 1) as usize,
                    (pos.y as isize + dy).clamp(0, rows as isize - 1) as usize,
                )
            }
            None => GridPos::new(sim.rng.gen_range(0..cols), sim.rng.gen_range(0..rows)),
        };
        if terrains.contains(&sim.map.cell(candidate).terrain) {
            return candidate;
        }
    }
    GridPos::new(sim.rng.gen_range(0..cols), sim.rng.gen_range(0..rows))
}

fn affected_cells(sim: &Simulator, center: GridPos, radius: f64, terrains: &[Terrain]) -> Vec<GridPos> {
    let reach = radius.floor() as isize;
    let mut cells = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let (x, y) = (center.x as isize + dx, center.y as isize + dy);
            if !sim.map.in_bounds(x, y) {
                continue;
            }
            let pos = GridPos::new(x as usize, y as usize);
            if pos.euclidean(&center) <= radius && terrains.contains(&sim.map.cell(pos).terrain) {
                cells.push(pos);
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::Attributes;
    use crate::evolution::map::WorldMap;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn plains_sim(cols: usize, rows: usize) -> Simulator {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut map = WorldMap::from_terrain(cols, rows, vec![Terrain::Plains; cols * rows], &mut rng);
        for cell in &mut map.cells {
            cell.attributes = Attributes::new(40.0, 40.0, 80.0, 40.0, 800.0);
        }
        Simulator::from_parts(SimulationConfig::default(), map, Vec::new(), rng)
    }

    #[test]
    fn test_flood_hits_centre_hardest() {
        let mut sim = plains_sim(15, 15);
        spawn_disaster(&mut sim, DisasterKind::Flood);
        let disaster = sim.disasters[0].clone();
        assert_eq!(disaster.remaining, 3);
        assert!(disaster.cells.iter().all(|p| p.euclidean(&disaster.center) <= 3.0));

        let centre = sim.map.cell(disaster.center);
        assert!((centre.attributes.population - 640.0).abs() < 1e-9);
        assert!((centre.attributes.economy - 68.0).abs() < 1e-9);
        assert!((centre.attributes.tech - 38.0).abs() < 1e-9);
        assert_eq!(sim.events.latest().map(|e| e.tag()), Some("disaster"));
    }

    #[test]
    fn test_rim_cells_are_untouched() {
        let mut sim = plains_sim(15, 15);
        spawn_disaster(&mut sim, DisasterKind::Flood);
        let disaster = sim.disasters[0].clone();
        for &p in &disaster.cells {
            if (p.euclidean(&disaster.center) - 3.0).abs() < 1e-9 {
                assert!((sim.map.cell(p).attributes.population - 800.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_disaster_skips_unaffected_terrain() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let map = WorldMap::from_terrain(9, 9, vec![Terrain::Forest; 81], &mut rng);
        let mut sim = Simulator::from_parts(SimulationConfig::default(), map, Vec::new(), rng);
        spawn_disaster(&mut sim, DisasterKind::Earthquake);
        assert!(sim.disasters[0].cells.is_empty());
    }

    #[test]
    fn test_disaster_ends_after_duration() {
        let mut sim = plains_sim(10, 10);
        let id = spawn_disaster(&mut sim, DisasterKind::Earthquake);
        advance_disasters(&mut sim);
        assert_eq!(sim.disasters.len(), 1);
        advance_disasters(&mut sim);
        assert!(sim.disasters.is_empty());
        match &sim.events.latest().unwrap().event_type {
            EventType::DisasterEnd { disaster_id, kind } => {
                assert_eq!(*disaster_id, id);
                assert_eq!(*kind, DisasterKind::Earthquake);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_attributes_never_negative() {
        let mut sim = plains_sim(12, 12);
        for _ in 0..5 {
            spawn_disaster(&mut sim, DisasterKind::VolcanicEruption);
        }
        for _ in 0..3 {
            advance_disasters(&mut sim);
        }
        for cell in &sim.map.cells {
            for attr in Attribute::ALL {
                assert!(cell.attributes.get(attr) >= 0.0);
            }
        }
    }
}
