//! Civilization lifecycle: merge, secession, split, collapse and revival

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::types::{Attributes, CivId, GridPos};
use crate::evolution::civilization::{base_name, successor_name, Civilization, DeadCivilization, Strategy};
use crate::evolution::events::EventType;
use crate::evolution::map::centroid;
use crate::evolution::simulation::Simulator;
use crate::evolution::systems::{territory_centroid, update_relations};

const MERGE_MIN_RELATION: f64 = 80.0;
const SPLIT_MIN_CELLS: usize = 5000;
const SPLIT_MIN_UNSTABLE_YEARS: u32 = 5;
const SPLIT_MIN_POPULATION: f64 = 100_000.0;
const SPLIT_COOLDOWN: u32 = 50;
const SPLIT_HOSTILITY: f64 = -50.0;
const SECESSION_CHANCE: f64 = 0.3;
const REVIVAL_DELAY_YEARS: i32 = 500;
const REVIVAL_WINDOW: isize = 5;
const ALLIANCE_SUFFIXES: [&str; 3] = [" Alliance", " Empire", " Civilization"];

/// One lifecycle pass, recomputing territory after every structural change
pub fn run_lifecycle(sim: &mut Simulator) {
    if let Some((a, b)) = find_merge_pair(sim) {
        merge_civilizations(sim, a, b);
        update_relations(sim);
    }

    run_secessions(sim);

    if let Some(id) = find_split_candidate(sim) {
        split_civilization(sim, id);
        sim.recompute_territory();
    }

    for i in (0..sim.civilizations.len()).rev() {
        if should_collapse(sim, &sim.civilizations[i]) {
            let id = sim.civilizations[i].id;
            collapse_civilization(sim, id);
            sim.recompute_territory();
        }
    }

    if let Some((index, area)) = find_revival(sim) {
        revive_civilization(sim, index, area);
        sim.recompute_territory();
    }
}

// === MERGE ===

pub fn can_merge(sim: &Simulator, a: &Civilization, b: &Civilization) -> bool {
    a.relation_with(b.id) >= MERGE_MIN_RELATION
        && (a.attributes.culture - b.attributes.culture).abs() <= 20.0
        && (a.attributes.economy - b.attributes.economy).abs() <= 30.0
        && a.strategy != Strategy::Expansionist
        && b.strategy != Strategy::Expansionist
        && sim.map.are_adjacent(a.id, b.id)
}

/// First pair in founding order that qualifies
pub fn find_merge_pair(sim: &Simulator) -> Option<(CivId, CivId)> {
    let civs = &sim.civilizations;
    for i in 0..civs.len() {
        for j in (i + 1)..civs.len() {
            if can_merge(sim, &civs[i], &civs[j]) {
                return Some((civs[i].id, civs[j].id));
            }
        }
    }
    None
}

/// "Aegean 2" + "Nile Empire" -> "Aegean-Nile Alliance"
pub fn alliance_name(a: &str, b: &str) -> String {
    fn stem(name: &str) -> &str {
        let base = base_name(name);
        ALLIANCE_SUFFIXES
            .iter()
            .find_map(|s| base.strip_suffix(s))
            .unwrap_or(base)
            .trim_end()
    }
    format!("{}-{} Alliance", stem(a), stem(b))
}

/// Replace `a` and `b` with one successor holding both realms
pub fn merge_civilizations(sim: &mut Simulator, a: CivId, b: CivId) -> Option<CivId> {
    let first = sim.civ(a)?.clone();
    let second = sim.civ(b)?.clone();

    let (x, y) = (&first.attributes, &second.attributes);
    let attributes = Attributes::new(
        (x.tech + y.tech) / 2.0,
        (x.culture + y.culture) / 2.0,
        (x.economy + y.economy) / 2.0,
        (x.military + y.military) / 2.0,
        x.population + y.population,
    );

    let id = sim.next_civ_id();
    let name = alliance_name(&first.name, &second.name);
    let mut successor = Civilization::successor(id, name, attributes, &mut sim.rng);
    successor.inherit_legacy(&first.legacy);
    successor.inherit_legacy(&second.legacy);
    successor.position = centroid(&[first.position, second.position]).unwrap_or(first.position);

    sim.map.transfer_territory(a, id);
    sim.map.transfer_territory(b, id);
    sim.remove_civilization(a);
    sim.remove_civilization(b);

    for other in &mut sim.civilizations {
        let relation = (first.relation_with(other.id) + second.relation_with(other.id)) / 2.0;
        other.relations.insert(id, relation);
        successor.relations.insert(other.id, relation);
    }

    let description = format!("{} and {} merged into {}", first.name, second.name, successor.name);
    sim.civilizations.push(successor);
    let year = sim.year;
    sim.events.add_event(
        EventType::Merge { absorbed: (a, b), successor: id },
        year,
        description,
        vec![a, b, id],
        None,
    );
    Some(id)
}

// === SECESSION ===

/// Chronically unstable civilizations may lose a breakaway state on free land
///
/// Also counts down split cooldowns. Nothing happens once the world holds
/// `max_civilizations` civilizations.
pub fn run_secessions(sim: &mut Simulator) {
    let cap = sim.config.civilizations.max_civilizations;
    for i in (0..sim.civilizations.len()).rev() {
        if sim.civilizations.len() >= cap {
            return;
        }
        let civ = &mut sim.civilizations[i];
        if civ.split_cooldown > 0 {
            civ.split_cooldown -= 1;
            continue;
        }
        let restless = civ.stability < 30.0 && civ.unstable_years > 10;
        let id = civ.id;
        if restless && sim.rng.gen::<f64>() < SECESSION_CHANCE {
            secede(sim, id);
        }
    }
}

/// Half of `parent` breaks away onto a free patch of land
pub fn secede(sim: &mut Simulator, parent: CivId) -> Option<CivId> {
    let area = sim.map.find_suitable_area_for_revival(&mut sim.rng)?;
    let id = sim.next_civ_id();

    let civ = sim.civ_mut(parent)?;
    civ.attributes = civ.attributes.map(|v| v * 0.5);
    civ.split_cooldown = SPLIT_COOLDOWN;
    let (name, attributes) = (format!("{} Secession", civ.name), civ.attributes);
    let description = format!("{} broke away from {}", name, civ.name);

    let mut successor = Civilization::successor(id, name, attributes, &mut sim.rng);
    successor.split_cooldown = SPLIT_COOLDOWN;
    successor.position = area;
    sim.map.assign_initial_territory(id, area, &mut sim.rng);
    seed_relations(sim, &mut successor);
    sim.civilizations.push(successor);

    let year = sim.year;
    sim.events.add_event(
        EventType::Split { parent, successor: id },
        year,
        description,
        vec![parent, id],
        Some(area),
    );
    Some(id)
}

/// New states start with mild random relations toward everybody
fn seed_relations(sim: &mut Simulator, newcomer: &mut Civilization) {
    for other in &mut sim.civilizations {
        let relation = (sim.rng.gen::<f64>() * 20.0 - 10.0).floor();
        other.relations.insert(newcomer.id, relation);
        newcomer.relations.insert(other.id, relation);
    }
}

// === SPLIT ===

pub fn can_split(sim: &Simulator, civ: &Civilization) -> bool {
    civ.split_cooldown == 0
        && civ.unstable_years >= SPLIT_MIN_UNSTABLE_YEARS
        && civ.attributes.population >= SPLIT_MIN_POPULATION
        && sim.map.cells.iter().filter(|c| c.is_owned_by(civ.id)).count() >= SPLIT_MIN_CELLS
}

/// Last civilization in founding order that qualifies
pub fn find_split_candidate(sim: &Simulator) -> Option<CivId> {
    sim.civilizations
        .iter()
        .rev()
        .find(|c| can_split(sim, c))
        .map(|c| c.id)
}

/// Halve an overgrown realm: a random half of its undisputed cells forms a hostile successor
pub fn split_civilization(sim: &mut Simulator, parent: CivId) -> Option<CivId> {
    let mut cells = sim.map.owned_cells(parent, false);
    cells.shuffle(&mut sim.rng);
    let breakaway = cells.split_off(cells.len() / 2);

    let id = sim.next_civ_id();
    let civ = sim.civ_mut(parent)?;
    let attributes = civ.attributes.map(|v| v * 0.4);
    civ.attributes = civ.attributes.map(|v| v * 0.6);
    civ.is_unstable = false;
    civ.unstable_years = 0;
    civ.split_cooldown = SPLIT_COOLDOWN;
    civ.relations.insert(id, SPLIT_HOSTILITY);

    let name = successor_name(&civ.name);
    let description = format!("{} split, giving rise to {}", civ.name, name);
    let (legacy, relations, fallback) = (civ.legacy.clone(), civ.relations.clone(), civ.position);

    let mut successor = Civilization::successor(id, name, attributes, &mut sim.rng);
    successor.inherit_legacy(&legacy);
    successor.split_cooldown = SPLIT_COOLDOWN;
    for &pos in &breakaway {
        sim.map.cell_mut(pos).owner = Some(id);
    }
    successor.position = territory_centroid(&sim.map, id).unwrap_or(fallback);

    for other in sim.civilizations.iter_mut().filter(|c| c.id != parent) {
        let relation = relations.get(&other.id).copied().unwrap_or(0.0);
        other.relations.insert(id, relation);
        successor.relations.insert(other.id, relation);
    }
    successor.relations.insert(parent, SPLIT_HOSTILITY);
    sim.civilizations.push(successor);

    let year = sim.year;
    sim.events.add_event(
        EventType::Split { parent, successor: id },
        year,
        description,
        vec![parent, id],
        None,
    );
    Some(id)
}

// === COLLAPSE ===

pub fn should_collapse(sim: &Simulator, civ: &Civilization) -> bool {
    civ.attributes.population < 1000.0
        || civ.total_power() < 50.0
        || civ.decline_years >= 10
        || !sim.map.cells.iter().any(|c| c.is_owned_by(civ.id))
}

/// Archive a civilization and free its land
pub fn collapse_civilization(sim: &mut Simulator, id: CivId) {
    let territory = sim.map.cell_stats(id);
    let Some(civ) = sim.remove_civilization(id) else {
        return;
    };
    sim.map.release_territory(id);
    sim.dead_civilizations
        .push(DeadCivilization::from_civilization(&civ, sim.year, territory));

    tracing::info!("{} collapsed in year {}", civ.name, sim.year);
    let year = sim.year;
    sim.events.add_event(
        EventType::Collapse { civ: id },
        year,
        format!("{} collapsed", civ.name),
        vec![id],
        None,
    );
}

// === REVIVAL ===

/// Summed power of the owners of every cell in the 11x11 window around `center`
pub fn surrounding_strength(sim: &Simulator, center: GridPos) -> f64 {
    let mut total = 0.0;
    for dy in -REVIVAL_WINDOW..=REVIVAL_WINDOW {
        for dx in -REVIVAL_WINDOW..=REVIVAL_WINDOW {
            let (x, y) = (center.x as isize + dx, center.y as isize + dy);
            if !sim.map.in_bounds(x, y) {
                continue;
            }
            if let Some(owner) = sim.map.cell(GridPos::new(x as usize, y as usize)).owner {
                total += sim.civ(owner).map(|c| c.total_power()).unwrap_or(0.0);
            }
        }
    }
    total
}

/// First archive entry old enough to return, with free land and weak neighbours
pub fn find_revival(sim: &mut Simulator) -> Option<(usize, GridPos)> {
    for index in 0..sim.dead_civilizations.len() {
        let dead = &sim.dead_civilizations[index];
        if dead.revived || sim.year - dead.death_year < REVIVAL_DELAY_YEARS {
            continue;
        }
        let peak_power = dead.peak_power();
        let Some(area) = sim.map.find_suitable_area_for_revival(&mut sim.rng) else {
            continue;
        };
        if surrounding_strength(sim, area) <= peak_power * 0.3 {
            return Some((index, area));
        }
    }
    None
}

/// Found an heir of archive entry `index` at `area`
pub fn revive_civilization(sim: &mut Simulator, index: usize, area: GridPos) -> Option<CivId> {
    let dead = sim.dead_civilizations.get(index)?.clone();
    let attributes = Attributes::new(
        dead.peak.tech * 0.5,
        dead.peak.culture * 0.7,
        dead.peak.economy * 0.5,
        dead.peak.military * 0.4,
        dead.peak.population * 0.3,
    );

    let id = sim.next_civ_id();
    let mut heir = Civilization::successor(id, successor_name(&dead.name), attributes, &mut sim.rng);
    heir.position = area;
    sim.map.assign_initial_territory(id, area, &mut sim.rng);
    seed_relations(sim, &mut heir);

    let description = format!("{} rose from the ruins of {}", heir.name, dead.name);
    tracing::info!("{}", description);
    sim.civilizations.push(heir);
    sim.dead_civilizations[index].revived = true;

    let year = sim.year;
    sim.events.add_event(
        EventType::Revival { civ: id, heir_of: dead.id },
        year,
        description,
        vec![id],
        Some(area),
    );
    Some(id)
}
