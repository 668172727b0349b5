//! Influence projection, diffusion and territory allocation

use std::cmp::Reverse;

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rand::Rng;
use rayon::prelude::*;

use crate::core::types::{CivId, GridPos};
use crate::evolution::map::WorldMap;
use crate::evolution::simulation::Simulator;

/// Source cells considered per civilization (row-major order)
const MAX_SOURCE_CELLS: usize = 50;
const MAX_RANGE_SQUARED: f64 = 100.0;
const DISTANCE_SCALE: f64 = 8.0;
const SPREAD_RATE: f64 = 0.1;
const SPREAD_FLOOR: f64 = 0.1;
const DISPUTE_RATIO: f64 = 0.85;
const INCUMBENT_MARGIN: f64 = 1.2;

struct InfluenceSource {
    civ: CivId,
    cells: Vec<(GridPos, f64)>,
}

/// Project every civilization's influence onto every land cell, then diffuse once
pub fn calculate_influence(sim: &mut Simulator) {
    let map = &mut sim.map;
    for cell in &mut map.cells {
        cell.influence.clear();
    }

    let sources: Vec<InfluenceSource> = sim
        .civilizations
        .iter()
        .filter_map(|civ| {
            let cells: Vec<(GridPos, f64)> = map
                .owned_cells(civ.id, false)
                .into_iter()
                .take(MAX_SOURCE_CELLS)
                .map(|p| (p, map.cell(p).attributes.local_strength()))
                .collect();
            (!cells.is_empty()).then_some(InfluenceSource { civ: civ.id, cells })
        })
        .collect();
    if sources.is_empty() {
        return;
    }

    // Drawn up front so the parallel pass stays deterministic
    let jitter: Vec<f64> = (0..map.cells.len())
        .map(|_| 0.97 + sim.rng.gen::<f64>() * 0.06)
        .collect();

    let cols = map.cols;
    let projected: Vec<AHashMap<CivId, f64>> = map
        .cells
        .par_iter()
        .enumerate()
        .map(|(i, cell)| {
            let mut out = AHashMap::new();
            if !cell.terrain.is_land() {
                return out;
            }
            let target = GridPos::new(i % cols, i / cols);

            let terrain_mod = cell.terrain.influence_modifier();
            let population_mod = if cell.limits.population > 0.0 {
                1.0 + cell.attributes.population / cell.limits.population * 0.5
            } else {
                1.0
            };
            let (resource_mod, stability_mod) = match cell.resource {
                Some(r) => (
                    1.0 + (r.effect_value() * 0.08).min(0.3),
                    if r.quantity < 5 { 0.7 } else { 1.0 },
                ),
                None => (0.8, 1.0),
            };
            let modifier = terrain_mod * population_mod * resource_mod * stability_mod * jitter[i];

            for source in &sources {
                let mut total = 0.0;
                for &(pos, strength) in &source.cells {
                    let dx = target.x as f64 - pos.x as f64;
                    let dy = target.y as f64 - pos.y as f64;
                    let d2 = dx * dx + dy * dy;
                    if d2 > MAX_RANGE_SQUARED {
                        continue;
                    }
                    let decay = 1.0 / (1.0 + d2.sqrt() / DISTANCE_SCALE);
                    total += strength * decay * modifier;
                }
                if total > 0.0 {
                    out.insert(source.civ, total);
                }
            }
            out
        })
        .collect();

    for (cell, influence) in map.cells.iter_mut().zip(projected) {
        cell.influence = influence;
    }

    spread_influence(map);
}

/// One smoothing pass: each entry moves 10% toward its obstacle-weighted neighbour average
pub fn spread_influence(map: &mut WorldMap) {
    let snapshot: Vec<AHashMap<CivId, f64>> = map.cells.iter().map(|c| c.influence.clone()).collect();
    let weights: Vec<f64> = map
        .cells
        .iter()
        .map(|c| 1.0 - c.terrain.influence_obstacle())
        .collect();

    let map_ref = &*map;
    let spread: Vec<AHashMap<CivId, f64>> = map_ref
        .cells
        .par_iter()
        .enumerate()
        .map(|(i, cell)| {
            let current = &snapshot[i];
            if !cell.terrain.is_land() || current.is_empty() {
                return current.clone();
            }
            let pos = map_ref.pos_of(i);
            current
                .iter()
                .map(|(&civ, &value)| {
                    if value < SPREAD_FLOOR {
                        return (civ, value);
                    }
                    let mut sum = 0.0;
                    let mut weight_sum = 0.0;
                    for n in map_ref.neighbors8(pos) {
                        let ni = map_ref.index(n);
                        if let Some(&v) = snapshot[ni].get(&civ) {
                            sum += v * weights[ni];
                            weight_sum += weights[ni];
                        }
                    }
                    if weight_sum > 0.0 {
                        let average = sum / weight_sum;
                        (civ, value * (1.0 - SPREAD_RATE) + average * SPREAD_RATE)
                    } else {
                        (civ, value)
                    }
                })
                .collect()
        })
        .collect();

    for (cell, influence) in map.cells.iter_mut().zip(spread) {
        cell.influence = influence;
    }
}

fn leader_and_runner_up(influence: &AHashMap<CivId, f64>) -> Option<(CivId, f64, f64)> {
    let mut ranked: Vec<(CivId, f64)> = influence.iter().map(|(&c, &v)| (c, v)).collect();
    // Ties broken by id for determinism across hash orders
    ranked.sort_by_key(|&(civ, value)| (Reverse(OrderedFloat(value)), civ));
    let (leader, max) = *ranked.first()?;
    let runner_up = ranked.get(1).map(|&(_, v)| v).unwrap_or(0.0);
    Some((leader, max, runner_up))
}

/// Assign each land cell to its strongest influence, with dispute and incumbency rules
pub fn allocate_territory(map: &mut WorldMap) {
    for cell in &mut map.cells {
        if !cell.terrain.is_land() {
            cell.release();
            continue;
        }
        let Some((leader, max, runner_up)) = leader_and_runner_up(&cell.influence) else {
            cell.owner = None;
            cell.disputed = false;
            continue;
        };

        let disputed = runner_up > max * DISPUTE_RATIO;
        let mut owner = leader;
        if let Some(incumbent) = cell.owner {
            if incumbent != leader {
                let incumbent_influence = cell.influence.get(&incumbent).copied().unwrap_or(0.0);
                if max < incumbent_influence * INCUMBENT_MARGIN {
                    owner = incumbent;
                }
            }
        }
        cell.owner = Some(owner);
        cell.disputed = disputed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::Attributes;
    use crate::evolution::civilization::{CivType, Civilization, Strategy};
    use crate::evolution::map::Terrain;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn plains(cols: usize, rows: usize) -> WorldMap {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        WorldMap::from_terrain(cols, rows, vec![Terrain::Plains; cols * rows], &mut rng)
    }

    #[test]
    fn test_incumbent_survives_small_lead() {
        let mut map = plains(1, 1);
        let cell = &mut map.cells[0];
        cell.owner = Some(CivId(1));
        cell.influence.insert(CivId(1), 100.0);
        cell.influence.insert(CivId(2), 115.0);
        allocate_territory(&mut map);
        assert_eq!(map.cells[0].owner, Some(CivId(1)));
        assert!(map.cells[0].disputed);
    }

    #[test]
    fn test_challenger_takes_large_lead() {
        let mut map = plains(1, 1);
        let cell = &mut map.cells[0];
        cell.owner = Some(CivId(1));
        cell.influence.insert(CivId(1), 100.0);
        cell.influence.insert(CivId(2), 130.0);
        allocate_territory(&mut map);
        assert_eq!(map.cells[0].owner, Some(CivId(2)));
        assert!(!map.cells[0].disputed);
    }

    #[test]
    fn test_no_influence_means_unowned() {
        let mut map = plains(2, 1);
        map.cells[0].owner = Some(CivId(1));
        allocate_territory(&mut map);
        assert_eq!(map.cells[0].owner, None);
    }

    #[test]
    fn test_water_is_cleared() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut map = WorldMap::from_terrain(1, 1, vec![Terrain::Water], &mut rng);
        map.cells[0].owner = Some(CivId(1));
        map.cells[0].influence.insert(CivId(1), 50.0);
        allocate_territory(&mut map);
        assert_eq!(map.cells[0].owner, None);
        assert!(map.cells[0].influence.is_empty());
    }

    #[test]
    fn test_influence_reaches_only_within_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let map = plains(30, 1);
        let civ = Civilization::with_attributes(CivId(1), "A", CivType::Agrarian, Strategy::Balanced, Attributes::default());
        let mut sim = Simulator::from_parts(SimulationConfig::default(), map, vec![civ], ChaCha8Rng::seed_from_u64(3));
        sim.map.assign_initial_territory(CivId(1), GridPos::new(0, 0), &mut rng);
        calculate_influence(&mut sim);
        assert!(sim.map.cells[0].influence.get(&CivId(1)).copied().unwrap_or(0.0) > 0.0);
        assert!(sim.map.cells[29].influence.is_empty());
    }

    #[test]
    fn test_spread_moves_toward_neighbours() {
        let mut map = plains(3, 1);
        map.cells[0].influence.insert(CivId(1), 10.0);
        map.cells[1].influence.insert(CivId(1), 0.0);
        map.cells[2].influence.insert(CivId(1), 10.0);
        map.cells[1].influence.insert(CivId(1), 1.0);
        spread_influence(&mut map);
        // 1.0 * 0.9 + 10.0 * 0.1
        assert!((map.cells[1].influence[&CivId(1)] - 1.9).abs() < 1e-9);
    }
}
