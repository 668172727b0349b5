//! Civilization <-> cell attribute flow and the per-cell resource economy

use ahash::AHashMap;

use crate::core::types::{Attribute, Attributes, CivId, GridPos};
use crate::evolution::map::{centroid, TerritoryCell, WorldMap};
use crate::evolution::resource::{ResourceTally, ResourceType};
use crate::evolution::simulation::Simulator;
use crate::evolution::tech::GrowthModifiers;

const DIFFUSION_RATE: f64 = 0.1;
const MAX_DIFFUSION_NEIGHBORS: usize = 4;
const UNSUPPLIED_STARVATION: f64 = 0.015;
const SHORTAGE_LEVEL: i64 = 5;
const ABUNDANCE_LEVEL: i64 = 15;

/// Spread each civilization's totals over its cells, favouring the core and suitable terrain
pub fn distribute_civ_attributes_to_cells(sim: &mut Simulator) {
    let map = &mut sim.map;
    for civ in &sim.civilizations {
        let cells = map.owned_cells(civ.id, false);
        let Some(center) = centroid_f64(&cells) else {
            continue;
        };
        let n = cells.len() as f64;
        let share = civ.attributes.map(|v| v / n);

        for pos in cells {
            let cell = map.cell_mut(pos);
            let distance = (pos.x as f64 - center.0).abs() + (pos.y as f64 - center.1).abs();
            let distance_weight = (-distance / 20.0).exp();
            let terrain_weight = cell.terrain.distribution_weights();
            for attr in Attribute::ALL {
                let added = share.get(attr) * distance_weight * terrain_weight.get(attr);
                let value = (cell.attributes.get(attr) + added).min(cell.limits.get(attr));
                cell.attributes.set(attr, value);
            }
        }
    }
}

fn centroid_f64(cells: &[GridPos]) -> Option<(f64, f64)> {
    if cells.is_empty() {
        return None;
    }
    let n = cells.len() as f64;
    let sx: f64 = cells.iter().map(|p| p.x as f64).sum();
    let sy: f64 = cells.iter().map(|p| p.y as f64).sum();
    Some((sx / n, sy / n))
}

#[derive(Clone, Copy)]
struct CellSnapshot {
    owner: Option<CivId>,
    disputed: bool,
    attributes: Attributes,
}

/// Per-tick cell update: neighbour diffusion, then resource production and consumption
///
/// Cells whose population reaches zero lose their owner.
pub fn update_cell_attributes(sim: &mut Simulator) {
    let modifiers: AHashMap<CivId, GrowthModifiers> = sim
        .civilizations
        .iter()
        .map(|c| (c.id, c.modifiers))
        .collect();
    let map = &mut sim.map;
    let snapshot: Vec<CellSnapshot> = map
        .cells
        .iter()
        .map(|c| CellSnapshot {
            owner: c.owner,
            disputed: c.disputed,
            attributes: c.attributes,
        })
        .collect();

    for i in 0..map.cells.len() {
        let pos = map.pos_of(i);
        let Some(owner) = map.cells[i].owner else {
            continue;
        };
        if map.cells[i].disputed {
            continue;
        }

        diffuse(map, &snapshot, pos, owner);

        let production = modifiers.get(&owner).copied().unwrap_or_default();
        let cell = &mut map.cells[i];
        if cell.resource.is_some() {
            settle_resource(cell, &production);
            cell.clamp_attributes();
        } else {
            let deaths = (cell.attributes.population * UNSUPPLIED_STARVATION).floor();
            cell.attributes.population = (cell.attributes.population - deaths).max(0.0);
            cell.attributes.tech *= 0.95;
            cell.attributes.culture *= 0.95;
            cell.attributes.economy *= 0.94;
            cell.attributes.military *= 0.95;
        }

        if cell.attributes.population <= 0.0 {
            cell.release();
        }
    }
}

fn diffuse(map: &mut WorldMap, snapshot: &[CellSnapshot], pos: GridPos, owner: CivId) {
    let i = map.index(pos);
    let current = map.cells[i].attributes;
    let mut total = Attributes::default();
    let mut count = 0;
    for n in map.neighbors8(pos) {
        if count >= MAX_DIFFUSION_NEIGHBORS {
            break;
        }
        let neighbor = &snapshot[map.index(n)];
        if neighbor.owner == Some(owner) && !neighbor.disputed {
            for attr in Attribute::ALL {
                *total.get_mut(attr) += neighbor.attributes.get(attr) - current.get(attr);
            }
            count += 1;
        }
    }
    if count > 0 {
        let cell = &mut map.cells[i];
        for attr in Attribute::ALL {
            *cell.attributes.get_mut(attr) += total.get(attr) / count as f64 * DIFFUSION_RATE;
        }
        cell.clamp_attributes();
    }
}

fn development_consumption(kind: ResourceType, a: &Attributes) -> i64 {
    let raw = match kind {
        ResourceType::Mineral => (a.economy * 0.02 + a.military * 0.025) * 1.5,
        ResourceType::Energy => (a.tech * 0.025 + a.military * 0.02) * 1.5,
        ResourceType::Culture => (a.culture * 0.03 + a.economy * 0.008) * 1.5,
        ResourceType::Rare => (a.tech * 0.04 + a.military * 0.04) * 2.0,
        ResourceType::Food => 0.0,
    };
    raw.floor() as i64
}

fn settle_resource(cell: &mut TerritoryCell, production: &GrowthModifiers) {
    let Some(mut resource) = cell.resource else {
        return;
    };
    let kind = resource.kind;
    let mut quantity = resource.quantity as i64;
    let a = &mut cell.attributes;

    let rate = kind.collection_rate() * (1.0 + a.tech / 500.0 + a.economy / 800.0);
    let collection =
        (a.population * rate * kind.base_value() * production.production_factor(kind)).floor() as i64;

    if kind == ResourceType::Food {
        let consumption = (a.population * 0.045).floor() as i64 + (quantity as f64 * 0.06).floor() as i64;
        if quantity + collection < consumption {
            let available = (quantity + collection) as f64;
            let shortage = available / consumption as f64;
            let deaths = (a.population * (1.0 - shortage) * 0.9).floor();
            a.population = (a.population - deaths).max(0.0);
            quantity = 1;
            a.tech *= 0.92;
            a.culture *= 0.91;
            a.economy *= 0.90;
            a.military *= 0.91;
        } else {
            quantity = (quantity + collection - consumption).min(kind.production_cap() as i64);
            let growth = a.population * 0.00008 * (quantity as f64 / cell.limits.population);
            a.population = (a.population + growth).min(cell.limits.population);
        }
    } else {
        let maintenance = (a.population * 0.003).floor() as i64;
        let wear = (quantity as f64 * 0.08).floor() as i64;
        let consumption = maintenance + development_consumption(kind, a) + wear;
        quantity = (quantity + collection - consumption).clamp(1, kind.production_cap() as i64);

        if quantity < SHORTAGE_LEVEL {
            match kind {
                ResourceType::Mineral => {
                    a.economy *= 0.85;
                    a.military *= 0.85;
                }
                ResourceType::Energy => {
                    a.tech *= 0.85;
                    a.military *= 0.85;
                }
                ResourceType::Culture => {
                    a.culture *= 0.85;
                    a.economy *= 0.92;
                }
                ResourceType::Rare => {
                    a.tech *= 0.8;
                    a.military *= 0.8;
                }
                ResourceType::Food => {}
            }
        }
    }

    resource.quantity = quantity.max(0) as u32;
    cell.resource = Some(resource);

    let a = &mut cell.attributes;
    let limits = cell.limits;
    if quantity > SHORTAGE_LEVEL {
        let q = quantity as f64;
        let p = a.population;
        let growth = match kind {
            ResourceType::Mineral => Attributes::new(0.0, 0.0, p * 0.00004 * q / 50.0, p * 0.00003 * q / 50.0, 0.0),
            ResourceType::Energy => Attributes::new(p * 0.00004 * q / 40.0, 0.0, 0.0, p * 0.00003 * q / 40.0, 0.0),
            ResourceType::Culture => Attributes::new(0.0, p * 0.00006 * q / 30.0, p * 0.00002 * q / 30.0, 0.0, 0.0),
            ResourceType::Rare => Attributes::new(p * 0.00006 * q / 20.0, 0.0, 0.0, p * 0.00005 * q / 20.0, 0.0),
            ResourceType::Food => Attributes::default(),
        };
        for attr in Attribute::CORE {
            let value = (a.get(attr) + growth.get(attr)).min(limits.get(attr));
            a.set(attr, value);
        }
    }

    if quantity > ABUNDANCE_LEVEL {
        match kind {
            ResourceType::Food => a.population *= 1.0005,
            ResourceType::Mineral => a.economy *= 1.0008,
            ResourceType::Energy => a.tech *= 1.0008,
            ResourceType::Culture => a.culture *= 1.001,
            ResourceType::Rare => a.tech *= 1.001,
        }
    }
}

/// Civilization totals become the sum over owned, undisputed cells
pub fn aggregate_cell_attributes(sim: &mut Simulator) {
    let mut totals: AHashMap<CivId, Attributes> = AHashMap::new();
    for cell in sim.map.cells.iter().filter(|c| !c.disputed) {
        if let Some(owner) = cell.owner {
            let sum = totals.entry(owner).or_default();
            for attr in Attribute::ALL {
                *sum.get_mut(attr) += cell.attributes.get(attr);
            }
        }
    }
    for civ in &mut sim.civilizations {
        civ.attributes = totals.get(&civ.id).copied().unwrap_or_default();
    }
}

/// Resource stock of a civilization's undisputed cells
pub fn calculate_civilization_resources(map: &WorldMap, civ: CivId) -> ResourceTally {
    let mut tally = ResourceTally::default();
    for cell in map.cells.iter().filter(|c| c.is_held_by(civ)) {
        if let Some(r) = cell.resource {
            tally.add(r.kind, r.quantity);
        }
    }
    tally
}

/// Rounded centroid of a civilization's undisputed cells
pub fn territory_centroid(map: &WorldMap, civ: CivId) -> Option<GridPos> {
    centroid(&map.owned_cells(civ, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::evolution::civilization::{CivType, Civilization, Strategy};
    use crate::evolution::map::Terrain;
    use crate::evolution::resource::Resource;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sim_with(cols: usize, rows: usize, attributes: Attributes) -> Simulator {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut map = WorldMap::from_terrain(cols, rows, vec![Terrain::Plains; cols * rows], &mut rng);
        for cell in &mut map.cells {
            cell.resource = None;
        }
        let civ = Civilization::with_attributes(CivId(1), "A", CivType::Agrarian, Strategy::Balanced, attributes);
        Simulator::from_parts(SimulationConfig::default(), map, vec![civ], rng)
    }

    fn own_all(sim: &mut Simulator, population: f64) {
        for cell in &mut sim.map.cells {
            cell.owner = Some(CivId(1));
            cell.attributes = Attributes::new(10.0, 10.0, 10.0, 10.0, population);
        }
    }

    #[test]
    fn test_aggregate_sums_undisputed_cells() {
        let mut sim = sim_with(3, 1, Attributes::default());
        own_all(&mut sim, 100.0);
        sim.map.cells[2].disputed = true;
        aggregate_cell_attributes(&mut sim);
        let civ = sim.civ(CivId(1)).unwrap();
        assert!((civ.attributes.tech - 20.0).abs() < 1e-9);
        assert!((civ.attributes.population - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_respects_limits() {
        let mut sim = sim_with(3, 3, Attributes::new(10_000.0, 10_000.0, 10_000.0, 10_000.0, 1e7));
        own_all(&mut sim, 100.0);
        distribute_civ_attributes_to_cells(&mut sim);
        for cell in &sim.map.cells {
            assert_eq!(cell.attributes, cell.limits);
        }
    }

    #[test]
    fn test_unsupplied_cells_decline() {
        let mut sim = sim_with(1, 1, Attributes::default());
        own_all(&mut sim, 1000.0);
        update_cell_attributes(&mut sim);
        let cell = &sim.map.cells[0];
        assert!((cell.attributes.population - 985.0).abs() < 1e-9);
        assert!((cell.attributes.economy - 9.4).abs() < 1e-9);
    }

    #[test]
    fn test_zero_population_loses_owner() {
        let mut sim = sim_with(2, 1, Attributes::default());
        own_all(&mut sim, 0.0);
        update_cell_attributes(&mut sim);
        assert!(sim.map.cells.iter().all(|c| c.owner.is_none()));
    }

    #[test]
    fn test_food_surplus_grows_population() {
        let mut sim = sim_with(1, 1, Attributes::default());
        own_all(&mut sim, 500.0);
        sim.map.cells[0].attributes.tech = 0.0;
        sim.map.cells[0].attributes.economy = 0.0;
        // collection floor(500 * 0.008 * 10) = 40; consumption floor(22.5) + 0 = 22
        sim.map.cells[0].resource = Some(Resource::new(ResourceType::Food, 1));
        update_cell_attributes(&mut sim);
        let cell = &sim.map.cells[0];
        assert_eq!(cell.resource.map(|r| r.quantity), Some(19));
        assert!(cell.attributes.population > 500.0);
        assert!(cell.owner.is_some());
    }

    #[test]
    fn test_resource_quantity_stays_within_caps() {
        let mut sim = sim_with(2, 2, Attributes::default());
        own_all(&mut sim, 1000.0);
        for (i, kind) in [ResourceType::Mineral, ResourceType::Energy, ResourceType::Culture, ResourceType::Rare]
            .into_iter()
            .enumerate()
        {
            sim.map.cells[i].resource = Some(Resource::new(kind, 200));
        }
        for _ in 0..5 {
            update_cell_attributes(&mut sim);
        }
        for cell in &sim.map.cells {
            if let Some(r) = cell.resource {
                assert!(r.quantity >= 1 && r.quantity <= r.kind.production_cap());
            }
            for attr in Attribute::ALL {
                assert!(cell.attributes.get(attr) <= cell.limits.get(attr));
                assert!(cell.attributes.get(attr) >= 0.0);
            }
        }
    }

    #[test]
    fn test_civilization_resources_skip_disputed() {
        let mut sim = sim_with(2, 1, Attributes::default());
        own_all(&mut sim, 100.0);
        sim.map.cells[0].resource = Some(Resource::new(ResourceType::Food, 4));
        sim.map.cells[1].resource = Some(Resource::new(ResourceType::Food, 9));
        sim.map.cells[1].disputed = true;
        let tally = calculate_civilization_resources(&sim.map, CivId(1));
        assert_eq!(tally.food, 4);
    }
}
