//! Whole-run invariants over random seeds

use std::collections::HashSet;

use civ_evolution::core::config::SimulationConfig;
use civ_evolution::core::types::Attribute;
use civ_evolution::evolution::{SimulationView, Simulator};
use proptest::prelude::*;

fn small_config(seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default().with_seed(seed);
    config.map.cols = 32;
    config.map.rows = 32;
    config
}

fn check_world(sim: &Simulator) -> Result<(), TestCaseError> {
    for cell in &sim.map.cells {
        for attr in Attribute::ALL {
            let value = cell.attributes.get(attr);
            prop_assert!(value >= 0.0, "{:?} negative: {}", attr, value);
            prop_assert!(value <= cell.limits.get(attr) + 1e-6, "{:?} over limit: {}", attr, value);
        }
        if !cell.terrain.is_land() {
            prop_assert!(cell.owner.is_none());
        }
    }

    for a in &sim.civilizations {
        for b in &sim.civilizations {
            if a.id == b.id {
                continue;
            }
            let (ab, ba) = (sim.relation(a.id, b.id), sim.relation(b.id, a.id));
            prop_assert_eq!(ab, ba);
            prop_assert!((-100.0..=100.0).contains(&ab));
        }
    }

    prop_assert!(sim.events.len() <= sim.events.capacity());
    let ids: Vec<u32> = sim.events.iter().map(|e| e.id).collect();
    prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let mut seen = HashSet::new();
    for civ in &sim.civilizations {
        prop_assert!(seen.insert(civ.id), "duplicate live id {:?}", civ.id);
    }
    for dead in &sim.dead_civilizations {
        prop_assert!(seen.insert(dead.id), "dead id {:?} reused", dead.id);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn test_invariants_hold_through_run(seed in any::<u64>()) {
        let mut sim = Simulator::new(small_config(seed)).unwrap();
        check_world(&sim)?;
        for _ in 0..60 {
            sim.evolve();
            check_world(&sim)?;
        }
    }

    #[test]
    fn test_same_seed_same_history(seed in any::<u64>()) {
        let mut a = Simulator::new(small_config(seed)).unwrap();
        let mut b = Simulator::new(small_config(seed)).unwrap();
        a.run(20);
        b.run(20);
        prop_assert_eq!(a.year(), b.year());
        prop_assert_eq!(a.civilizations.len(), b.civilizations.len());
        let owners_a: Vec<_> = a.map.cells.iter().map(|c| c.owner).collect();
        let owners_b: Vec<_> = b.map.cells.iter().map(|c| c.owner).collect();
        prop_assert_eq!(owners_a, owners_b);
        let tags_a: Vec<_> = a.events.iter().map(|e| e.tag()).collect();
        let tags_b: Vec<_> = b.events.iter().map(|e| e.tag()).collect();
        prop_assert_eq!(tags_a, tags_b);
    }
}

#[test]
fn test_years_advance_by_ten() {
    let mut sim = Simulator::new(small_config(1)).unwrap();
    let reports = sim.run(4);
    let years: Vec<i32> = reports.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![-2990, -2980, -2970, -2960]);
    let full: Vec<bool> = reports.iter().map(|r| r.full_update).collect();
    assert_eq!(full, vec![false, true, false, true]);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = small_config(1);
    config.map.cols = 0;
    assert!(Simulator::new(config).is_err());

    let mut config = small_config(1);
    config.civilizations.min_count = 6;
    assert!(Simulator::new(config).is_err());

    assert!(SimulationConfig::from_toml_str("start_year = -2995").is_err());
}
