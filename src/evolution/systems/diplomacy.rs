//! Diplomacy and relations system

use rand::Rng;

use crate::evolution::simulation::Simulator;

/// Weak civilizations drift together, then every pair drifts by gaps, strategy and noise
pub fn update_relations(sim: &mut Simulator) {
    apply_weak_alliance(sim);

    let n = sim.civilizations.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (&sim.civilizations[i], &sim.civilizations[j]);
            let mut relation = a.relation_with(b.id);

            let tech_gap = (a.attributes.tech - b.attributes.tech).abs();
            let culture_gap = (a.attributes.culture - b.attributes.culture).abs();
            let economy_gap = (a.attributes.economy - b.attributes.economy).abs();

            if tech_gap > 30.0 {
                relation -= 0.2;
            } else if tech_gap < 10.0 {
                relation += 0.1;
            }
            if culture_gap > 30.0 {
                relation -= 0.15;
            } else if culture_gap < 15.0 {
                relation += 0.15;
            }
            if economy_gap > 40.0 {
                relation -= 0.2;
            }

            relation += a.strategy.relation_factor(b.strategy) * 0.5;
            relation -= relation * 0.05;
            relation += sim.rng.gen::<f64>() - 0.5;

            let (a_id, b_id) = (a.id, b.id);
            sim.set_relation(a_id, b_id, relation);
        }
    }
}

/// Civilizations under half the leader's power warm to each other
pub fn apply_weak_alliance(sim: &mut Simulator) {
    let strongest = sim
        .civilizations
        .iter()
        .map(|c| c.total_power())
        .fold(0.0, f64::max);
    if strongest <= 0.0 {
        return;
    }

    let weak: Vec<_> = sim
        .civilizations
        .iter()
        .filter(|c| c.total_power() < strongest * 0.5)
        .map(|c| c.id)
        .collect();
    if weak.len() < 2 {
        return;
    }

    for (i, &a) in weak.iter().enumerate() {
        for &b in &weak[i + 1..] {
            if sim.relation(a, b) < 50.0 {
                sim.adjust_relation(a, b, 1.0);
            }
        }
    }
}
