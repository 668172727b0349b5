//! Per-tick research driving

use crate::core::types::CivId;
use crate::evolution::events::EventType;
use crate::evolution::simulation::Simulator;
use crate::evolution::systems::calculate_civilization_resources;
use crate::evolution::tech::TechDefinition;

/// Progress multiplier applied per full tick
const RESEARCH_STEP: f64 = 1.0;

/// Idle civilizations pick the first affordable technology, then everyone makes progress
pub fn advance_research(sim: &mut Simulator) {
    if sim.tech.is_empty() {
        return;
    }

    let year = sim.year;
    let (tech, map) = (&sim.tech, &sim.map);
    let mut completed: Vec<(CivId, String, TechDefinition)> = Vec::new();

    for civ in &mut sim.civilizations {
        if civ.research.researching.is_none() {
            let resources = calculate_civilization_resources(map, civ.id);
            let next = tech
                .available_techs(civ)
                .into_iter()
                .find(|t| tech.can_afford(t, &resources))
                .map(|t| t.id.clone());
            if let Some(tech_id) = next {
                tech.start_research(civ, &tech_id, &resources);
            }
        }

        if let Some(done) = tech.update_research(civ, RESEARCH_STEP) {
            civ.add_technological_legacy(done.name.clone(), year);
            completed.push((civ.id, civ.name.clone(), done));
        }
    }

    for (id, name, done) in completed {
        sim.events.add_event(
            EventType::TechResearch { civ: id, tech_id: done.id.clone() },
            year,
            format!("{} mastered {}", name, done.name),
            vec![id],
            None,
        );
    }
}
