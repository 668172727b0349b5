//! Initial civilization placement

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::types::GridPos;
use crate::evolution::civilization::Civilization;
use crate::evolution::map::Terrain;
use crate::evolution::simulation::Simulator;

/// Found the starting civilizations on shuffled plains and forest cells
pub fn seed_civilizations(sim: &mut Simulator) {
    let civ_config = sim.config.civilizations.clone();
    let count = sim.rng.gen_range(civ_config.min_count..=civ_config.max_count);

    let mut civs = Vec::with_capacity(count);
    for i in 0..count {
        let id = sim.next_civ_id();
        let name = &civ_config.names[i % civ_config.names.len()];
        civs.push(Civilization::new(id, name.as_str(), &mut sim.rng));
    }

    for i in 0..civs.len() {
        for j in (i + 1)..civs.len() {
            let relation = (sim.rng.gen::<f64>() * 40.0 - 20.0).floor();
            let (a, b) = (civs[i].id, civs[j].id);
            civs[i].relations.insert(b, relation);
            civs[j].relations.insert(a, relation);
        }
    }

    let mut sites: Vec<GridPos> = sim
        .map
        .positions()
        .filter(|&p| matches!(sim.map.cell(p).terrain, Terrain::Plains | Terrain::Forest))
        .collect();
    sites.shuffle(&mut sim.rng);

    for civ in &mut civs {
        let site = sites.pop().unwrap_or_else(|| {
            GridPos::new(
                sim.rng.gen_range(0..sim.map.cols),
                sim.rng.gen_range(0..sim.map.rows),
            )
        });
        civ.position = site;
        let claimed = sim.map.assign_initial_territory(civ.id, site, &mut sim.rng);
        tracing::debug!(
            "{} ({:?}, {:?}) founded at ({}, {}) with {} cells",
            civ.name,
            civ.civ_type,
            civ.strategy,
            site.x,
            site.y,
            claimed
        );
    }

    sim.civilizations.extend(civs);
}
