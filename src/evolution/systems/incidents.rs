//! Random world events: war, trade, diplomacy, internal reform, global shifts, breakthroughs

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{Attribute, CivId, GridPos};
use crate::evolution::events::EventType;
use crate::evolution::resource::{Resource, ResourceTally, ResourceType};
use crate::evolution::simulation::Simulator;

/// Resource types trade can bring in, with their base yield per unit of efficiency
const TRADE_YIELDS: [(ResourceType, f64); 4] = [
    (ResourceType::Mineral, 7.0),
    (ResourceType::Food, 10.5),
    (ResourceType::Energy, 8.4),
    (ResourceType::Rare, 3.5),
];
const BREAKTHROUGH_BOOST: f64 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breakthrough {
    TechBreakthrough,
    CulturalRevolution,
    EconomicBoom,
    MilitaryInnovation,
}

impl Breakthrough {
    pub const ALL: [Breakthrough; 4] = [
        Breakthrough::TechBreakthrough,
        Breakthrough::CulturalRevolution,
        Breakthrough::EconomicBoom,
        Breakthrough::MilitaryInnovation,
    ];

    pub fn attribute(&self) -> Attribute {
        match self {
            Breakthrough::TechBreakthrough => Attribute::Tech,
            Breakthrough::CulturalRevolution => Attribute::Culture,
            Breakthrough::EconomicBoom => Attribute::Economy,
            Breakthrough::MilitaryInnovation => Attribute::Military,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Breakthrough::TechBreakthrough => "technological breakthrough",
            Breakthrough::CulturalRevolution => "cultural revolution",
            Breakthrough::EconomicBoom => "economic boom",
            Breakthrough::MilitaryInnovation => "military innovation",
        }
    }
}

/// Flavour entry logged when nothing else happens
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChronicleKind {
    Internal,
    Diplomatic,
    Global,
}

impl ChronicleKind {
    pub const ALL: [ChronicleKind; 3] = [ChronicleKind::Internal, ChronicleKind::Diplomatic, ChronicleKind::Global];

    pub fn tag(&self) -> &'static str {
        match self {
            ChronicleKind::Internal => "internal",
            ChronicleKind::Diplomatic => "diplomatic",
            ChronicleKind::Global => "global",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ChronicleKind::Internal => "A civilization went through minor internal changes.",
            ChronicleKind::Diplomatic => "Two civilizations exchanged routine envoys.",
            ChronicleKind::Global => "The world passed a quiet decade.",
        }
    }
}

/// Log at most one event, trying each kind in priority order
pub fn generate_random_event(sim: &mut Simulator) {
    if let Some((a, b)) = find_war_pair(sim) {
        trigger_war(sim, a, b);
    } else if let Some((a, b)) = find_trade_pair(sim) {
        trigger_trade(sim, a, b);
    } else if let Some((a, b)) = find_diplomatic_pair(sim) {
        trigger_diplomatic(sim, a, b);
    } else if let Some(civ) = find_internal_candidate(sim) {
        trigger_internal(sim, civ);
    } else if global_conditions(sim) {
        trigger_global(sim);
    } else if balance_break_conditions(sim) {
        trigger_balance_break(sim);
    } else {
        trigger_chronicle(sim);
    }
}

/// First pair (founding order) satisfying `pred` that also shares a border
fn find_pair(sim: &Simulator, pred: impl Fn(&Simulator, usize, usize) -> bool) -> Option<(CivId, CivId)> {
    let n = sim.civilizations.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (sim.civilizations[i].id, sim.civilizations[j].id);
            if pred(sim, i, j) && sim.map.are_adjacent(a, b) {
                return Some((a, b));
            }
        }
    }
    None
}

pub fn find_war_pair(sim: &Simulator) -> Option<(CivId, CivId)> {
    find_pair(sim, |sim, i, j| {
        let (a, b) = (&sim.civilizations[i], &sim.civilizations[j]);
        a.relation_with(b.id) < -30.0 && (a.attributes.military > 50.0 || b.attributes.military > 50.0)
    })
}

pub fn find_trade_pair(sim: &Simulator) -> Option<(CivId, CivId)> {
    find_pair(sim, |sim, i, j| {
        let (a, b) = (&sim.civilizations[i], &sim.civilizations[j]);
        a.relation_with(b.id) > 30.0
            && a.attributes.economy > 40.0
            && b.attributes.economy > 40.0
            && a.attributes.culture > 30.0
            && b.attributes.culture > 30.0
    })
}

pub fn find_diplomatic_pair(sim: &Simulator) -> Option<(CivId, CivId)> {
    find_pair(sim, |sim, i, j| {
        let (a, b) = (&sim.civilizations[i], &sim.civilizations[j]);
        let relation = a.relation_with(b.id);
        relation > -20.0 && relation < 50.0 && (a.attributes.culture - b.attributes.culture).abs() < 30.0
    })
}

/// First populous, powerful civilization with badly unbalanced development
pub fn find_internal_candidate(sim: &Simulator) -> Option<CivId> {
    sim.civilizations
        .iter()
        .find(|c| {
            c.attributes.population > 20_000.0
                && c.attributes.core_total() > 100.0
                && c.attributes.core_spread() > 30.0
        })
        .map(|c| c.id)
}

fn global_conditions(sim: &mut Simulator) -> bool {
    sim.year > -2000 && sim.civilizations.len() >= 3 && sim.rng.gen::<f64>() < 0.1
}

/// All strengths within 80-120% of the mean, then a 15% roll
fn balance_break_conditions(sim: &mut Simulator) -> bool {
    if sim.civilizations.len() < 2 {
        return false;
    }
    let strengths: Vec<f64> = sim.civilizations.iter().map(|c| c.total_power()).collect();
    let mean = strengths.iter().sum::<f64>() / strengths.len() as f64;
    let balanced = strengths.iter().all(|&s| s >= mean * 0.8 && s <= mean * 1.2);
    balanced && sim.rng.gen::<f64>() < 0.15
}

fn civ_name(sim: &Simulator, id: CivId) -> String {
    sim.civ(id).map(|c| c.name.clone()).unwrap_or_else(|| id.to_string())
}

/// Border battle between `attacker` and `defender`; returns the event id
pub fn trigger_war(sim: &mut Simulator, attacker: CivId, defender: CivId) -> Option<u32> {
    let border = sim.map.adjacent_cells_between(attacker, defender);
    let &battle = border.choose(&mut sim.rng)?;

    let cell = sim.map.cell_mut(battle);
    cell.attributes.economy *= 0.8;
    cell.attributes.population *= 0.9;
    cell.attributes.military = (cell.attributes.military * 1.1).min(cell.limits.military);

    let zone: Vec<GridPos> = std::iter::once(battle).chain(sim.map.neighbors8(battle)).collect();
    for pos in zone {
        if let Some(r) = sim.map.cell_mut(pos).resource.as_mut() {
            r.quantity = ((r.quantity as f64 * 0.7).floor() as u32).max(1);
        }
    }

    let attacker_military = sim.civ(attacker)?.attributes.military;
    let defender_military = sim.civ(defender)?.attributes.military;
    let (winner, loser) = if attacker_military > defender_military {
        (attacker, defender)
    } else {
        (defender, attacker)
    };

    let mut loot = ResourceTally::default();
    let mut loser_cells = sim.map.owned_cells(loser, false);
    for _ in 0..3 {
        if loser_cells.is_empty() {
            break;
        }
        let index = sim.rng.gen_range(0..loser_cells.len());
        let pos = loser_cells.remove(index);
        if let Some(r) = sim.map.cell_mut(pos).resource.as_mut() {
            let gain = (r.quantity as f64 * 0.1).floor() as u32;
            loot.add(r.kind, gain);
            r.quantity = r.quantity.saturating_sub(gain).max(1);
        }
    }

    let year = sim.year;
    let loser_name = civ_name(sim, loser);
    if let Some(w) = sim.civ_mut(winner) {
        w.attributes.military *= 1.05;
        w.add_achievement(format!("Victory over {}", loser_name), year);
    }
    sim.adjust_relation(attacker, defender, -20.0);

    let description = format!(
        "{} and {} went to war on their border; {} prevailed and seized {} mineral, {} food, {} energy and {} rare",
        civ_name(sim, attacker),
        civ_name(sim, defender),
        civ_name(sim, winner),
        loot.mineral,
        loot.food,
        loot.energy,
        loot.rare
    );
    Some(sim.events.add_event(
        EventType::War { attacker, defender, winner, loot },
        year,
        description,
        vec![attacker, defender],
        Some(battle),
    ))
}

/// Border trade between two friendly, prosperous civilizations
pub fn trigger_trade(sim: &mut Simulator, a: CivId, b: CivId) -> Option<u32> {
    let border = sim.map.adjacent_cells_between(a, b);
    let &market = border.choose(&mut sim.rng)?;

    let (civ_a, civ_b) = (sim.civ(a)?, sim.civ(b)?);
    let efficiency = (civ_a.attributes.economy
        + civ_b.attributes.economy
        + civ_a.attributes.culture
        + civ_b.attributes.culture)
        / 400.0;

    let cell = sim.map.cell_mut(market);
    cell.attributes.economy = (cell.attributes.economy * (1.0 + 0.2 * efficiency)).min(cell.limits.economy);
    cell.attributes.culture = (cell.attributes.culture * (1.0 + 0.1 * efficiency)).min(cell.limits.culture);

    let yields: Vec<(ResourceType, u32)> = TRADE_YIELDS
        .iter()
        .map(|&(kind, base)| (kind, (base * efficiency).floor() as u32))
        .collect();
    deliver_trade_goods(sim, a, &yields);
    deliver_trade_goods(sim, b, &yields);

    let relation_gain = (10.0 * efficiency).floor();
    sim.adjust_relation(a, b, relation_gain);

    let yield_of = |kind: ResourceType| yields.iter().find(|y| y.0 == kind).map(|y| y.1).unwrap_or(0);
    let description = format!(
        "{} and {} traded across the border, each gaining {} mineral, {} food, {} energy and {} rare",
        civ_name(sim, a),
        civ_name(sim, b),
        yield_of(ResourceType::Mineral),
        yield_of(ResourceType::Food),
        yield_of(ResourceType::Energy),
        yield_of(ResourceType::Rare)
    );
    let year = sim.year;
    Some(sim.events.add_event(
        EventType::Trade { parties: (a, b), efficiency, relation_gain },
        year,
        description,
        vec![a, b],
        Some(market),
    ))
}

/// Three random held cells (with replacement) receive a third of each yield
fn deliver_trade_goods(sim: &mut Simulator, civ: CivId, yields: &[(ResourceType, u32)]) {
    let cells = sim.map.owned_cells(civ, false);
    if cells.is_empty() {
        return;
    }
    for _ in 0..3 {
        let pos = cells[sim.rng.gen_range(0..cells.len())];
        let existing = sim.map.cell(pos).resource;
        match existing {
            Some(_) => {
                let Some(r) = sim.map.cell_mut(pos).resource.as_mut() else {
                    continue;
                };
                let amount = yields.iter().find(|y| y.0 == r.kind).map(|y| y.1 / 3).unwrap_or(0);
                if amount > 0 {
                    r.quantity = (r.quantity + amount).min(r.kind.trade_cap());
                }
            }
            None => {
                let (kind, amount) = yields[sim.rng.gen_range(0..yields.len())];
                if amount / 3 > 0 {
                    sim.map.cell_mut(pos).resource = Some(Resource::new(kind, amount / 3));
                }
            }
        }
    }
}

pub fn trigger_diplomatic(sim: &mut Simulator, a: CivId, b: CivId) -> Option<u32> {
    let relation_change = sim.rng.gen::<f64>() * 20.0 - 10.0;
    sim.adjust_relation(a, b, relation_change);

    let outcome = if relation_change > 0.0 { "relations improved" } else { "relations soured" };
    let description = format!("{} and {} exchanged envoys; {}", civ_name(sim, a), civ_name(sim, b), outcome);
    let year = sim.year;
    Some(sim.events.add_event(
        EventType::Diplomatic { parties: (a, b), relation_change },
        year,
        description,
        vec![a, b],
        None,
    ))
}

/// Move tech and culture from over-developed held cells into lagging ones
pub fn trigger_internal(sim: &mut Simulator, civ: CivId) -> Option<u32> {
    let cells = sim.map.owned_cells(civ, false);
    if cells.len() < 2 {
        return None;
    }

    let tech_moved = rebalance(sim, &cells, Attribute::Tech);
    let culture_moved = rebalance(sim, &cells, Attribute::Culture);

    let description = format!("{} redistributed resources to balance its regions", civ_name(sim, civ));
    let year = sim.year;
    Some(sim.events.add_event(
        EventType::Internal { civ, tech_moved, culture_moved },
        year,
        description,
        vec![civ],
        None,
    ))
}

fn rebalance(sim: &mut Simulator, cells: &[GridPos], attr: Attribute) -> f64 {
    let average = cells.iter().map(|&p| sim.map.cell(p).attributes.get(attr)).sum::<f64>() / cells.len() as f64;
    let high: Vec<GridPos> = cells
        .iter()
        .copied()
        .filter(|&p| sim.map.cell(p).attributes.get(attr) > average * 1.2)
        .collect();
    let low: Vec<GridPos> = cells
        .iter()
        .copied()
        .filter(|&p| sim.map.cell(p).attributes.get(attr) < average * 0.8)
        .collect();
    if high.is_empty() || low.is_empty() {
        return 0.0;
    }

    let source = high[sim.rng.gen_range(0..high.len())];
    let target = low[sim.rng.gen_range(0..low.len())];
    let surplus = sim.map.cell(source).attributes.get(attr) - average * 1.2;
    let target_cell = sim.map.cell(target);
    let headroom = target_cell.limits.get(attr) - target_cell.attributes.get(attr);
    let amount = surplus.min(headroom).max(0.0);

    *sim.map.cell_mut(source).attributes.get_mut(attr) -= amount;
    *sim.map.cell_mut(target).attributes.get_mut(attr) += amount;
    amount
}

/// Scale every owned cell by a common factor in [0.8, 1.2)
pub fn trigger_global(sim: &mut Simulator) -> Option<u32> {
    let effect = sim.rng.gen::<f64>() * 0.4 - 0.2;
    let mut cells_affected = 0;
    for cell in sim.map.cells.iter_mut().filter(|c| c.owner.is_some()) {
        cell.attributes = cell.attributes.map(|v| v * (1.0 + effect));
        cell.clamp_attributes();
        cells_affected += 1;
    }

    let description = if effect > 0.0 {
        "A favourable climate brought growth to every civilization".to_string()
    } else {
        "A hard age struck every civilization".to_string()
    };
    let participants = sim.civilizations.iter().map(|c| c.id).collect();
    let year = sim.year;
    Some(sim.events.add_event(
        EventType::Global { effect, cells_affected },
        year,
        description,
        participants,
        None,
    ))
}

/// A random civilization gets +30 in one core attribute
pub fn trigger_balance_break(sim: &mut Simulator) -> Option<u32> {
    if sim.civilizations.is_empty() {
        return None;
    }
    let index = sim.rng.gen_range(0..sim.civilizations.len());
    let breakthrough = Breakthrough::ALL[sim.rng.gen_range(0..Breakthrough::ALL.len())];
    let year = sim.year;

    let civ = &mut sim.civilizations[index];
    *civ.attributes.get_mut(breakthrough.attribute()) += BREAKTHROUGH_BOOST;
    if breakthrough == Breakthrough::CulturalRevolution {
        civ.add_cultural_heritage("Cultural revolution", year);
    }
    let (id, description) = (civ.id, format!("{} achieved a {}", civ.name, breakthrough.name()));

    Some(sim.events.add_event(
        EventType::BalanceBreak { civ: id, breakthrough },
        year,
        description,
        vec![id],
        None,
    ))
}

pub fn trigger_chronicle(sim: &mut Simulator) -> Option<u32> {
    let kind = ChronicleKind::ALL[sim.rng.gen_range(0..ChronicleKind::ALL.len())];
    let year = sim.year;
    Some(sim.events.add_event(
        EventType::Chronicle { kind },
        year,
        kind.description().to_string(),
        Vec::new(),
        None,
    ))
}
