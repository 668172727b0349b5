//! Collapse and archive behaviour driven through `evolve`

use civ_evolution::core::config::SimulationConfig;
use civ_evolution::core::types::{Attributes, CivId};
use civ_evolution::evolution::civilization::{CivType, Civilization, Strategy};
use civ_evolution::evolution::map::{Terrain, WorldMap};
use civ_evolution::evolution::Simulator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Civ 1 holds the left half of a plains map; civ 2 the right half with no people left
fn dying_neighbour() -> Simulator {
    let (cols, rows) = (10, 6);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut map = WorldMap::from_terrain(cols, rows, vec![Terrain::Plains; cols * rows], &mut rng);
    for (i, cell) in map.cells.iter_mut().enumerate() {
        if i % cols < cols / 2 {
            cell.owner = Some(CivId(1));
            cell.attributes = Attributes::new(20.0, 20.0, 20.0, 20.0, 400.0);
        } else {
            cell.owner = Some(CivId(2));
            cell.attributes = Attributes::new(5.0, 5.0, 5.0, 5.0, 0.0);
        }
    }
    let civs = vec![
        Civilization::with_attributes(
            CivId(1),
            "Aegean",
            CivType::Agrarian,
            Strategy::Balanced,
            Attributes::new(600.0, 600.0, 600.0, 600.0, 12_000.0),
        ),
        Civilization::with_attributes(
            CivId(2),
            "Nile",
            CivType::Agrarian,
            Strategy::Balanced,
            Attributes::new(150.0, 150.0, 150.0, 150.0, 0.0),
        ),
    ];
    let mut sim = Simulator::from_parts(SimulationConfig::default().with_seed(42), map, civs, rng);
    sim.set_relation(CivId(1), CivId(2), 0.0);
    sim
}

#[test]
fn test_depopulated_civilization_is_archived() {
    let mut sim = dying_neighbour();

    let first = sim.evolve();
    assert!(!first.full_update);
    // Empty cells are abandoned on the very first tick
    assert!(sim.map.cells.iter().all(|c| c.owner != Some(CivId(2))));

    let second = sim.evolve();
    assert!(second.full_update);
    assert!(sim.civ(CivId(2)).is_none());
    assert_eq!(sim.dead_civilizations.len(), 1);

    let dead = &sim.dead_civilizations[0];
    assert_eq!(dead.id, CivId(2));
    assert_eq!(dead.name, "Nile");
    assert_eq!(dead.death_year, -2980);
    assert!(!dead.revived);
    assert!(sim.civ(CivId(1)).unwrap().relations.get(&CivId(2)).is_none());
    assert!(sim.events.iter().any(|e| e.tag() == "collapse" && e.participants == vec![CivId(2)]));
}

#[test]
fn test_fresh_ids_after_collapse() {
    let mut sim = dying_neighbour();
    sim.run(2);
    let next = sim.next_civ_id();
    assert!(next.0 > 2);
}
