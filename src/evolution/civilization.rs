//! Civilization - a polity with developmental attributes, strategy and legacy

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{Attribute, Attributes, CivId, GridPos};
use crate::evolution::map::CellStats;
use crate::evolution::tech::{GrowthModifiers, ResearchState};

const MIGRATION_COOLDOWN: u32 = 20;
const DECLINE_THRESHOLD: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CivType {
    Agrarian,
    Nomadic,
    Maritime,
    Highland,
    Mercantile,
}

impl CivType {
    pub const ALL: [CivType; 5] = [
        CivType::Agrarian,
        CivType::Nomadic,
        CivType::Maritime,
        CivType::Highland,
        CivType::Mercantile,
    ];

    pub fn initial_bonus(&self) -> Attributes {
        match self {
            CivType::Agrarian => Attributes::new(0.0, 5.0, 10.0, 0.0, 2000.0),
            CivType::Nomadic => Attributes::new(0.0, 0.0, 5.0, 10.0, -1000.0),
            CivType::Maritime => Attributes::new(5.0, 0.0, 15.0, 5.0, 0.0),
            CivType::Highland => Attributes::new(10.0, 10.0, 0.0, 15.0, -2000.0),
            CivType::Mercantile => Attributes::new(5.0, 5.0, 20.0, 0.0, 1000.0),
        }
    }

    pub fn growth_multiplier(&self) -> Attributes {
        match self {
            CivType::Agrarian => Attributes::new(0.8, 1.2, 1.5, 0.9, 1.3),
            CivType::Nomadic => Attributes::new(0.9, 0.9, 1.1, 1.4, 0.8),
            CivType::Maritime => Attributes::new(1.2, 1.0, 1.6, 1.1, 1.0),
            CivType::Highland => Attributes::new(1.3, 1.4, 0.8, 1.5, 0.7),
            CivType::Mercantile => Attributes::new(1.1, 1.1, 1.7, 0.8, 1.1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    Expansionist,
    Defensive,
    Cultural,
    Economic,
    Balanced,
}

/// Growth and diplomacy tendencies of a strategy
#[derive(Debug)]
pub struct StrategyEffect {
    /// Per-tick growth bonus drawn uniformly from `0..max`
    pub growth_bonus: &'static [(Attribute, f64)],
    /// Baseline relation drift toward everybody
    pub relation_base: f64,
    /// Extra drift toward civilizations following a specific strategy
    pub relation_toward: &'static [(Strategy, f64)],
}

const EXPANSIONIST: StrategyEffect = StrategyEffect {
    growth_bonus: &[(Attribute::Military, 1.5), (Attribute::Economy, 0.5)],
    relation_base: -0.5,
    relation_toward: &[(Strategy::Defensive, -0.3)],
};

const DEFENSIVE: StrategyEffect = StrategyEffect {
    growth_bonus: &[(Attribute::Military, 1.2), (Attribute::Tech, 0.5)],
    relation_base: 0.2,
    relation_toward: &[(Strategy::Expansionist, -0.4)],
};

const CULTURAL: StrategyEffect = StrategyEffect {
    growth_bonus: &[(Attribute::Culture, 1.5), (Attribute::Tech, 0.5)],
    relation_base: 0.3,
    relation_toward: &[(Strategy::Cultural, 0.2)],
};

const ECONOMIC: StrategyEffect = StrategyEffect {
    growth_bonus: &[(Attribute::Economy, 1.5), (Attribute::Culture, 0.5)],
    relation_base: 0.2,
    relation_toward: &[(Strategy::Economic, 0.2)],
};

const BALANCED: StrategyEffect = StrategyEffect {
    growth_bonus: &[
        (Attribute::Tech, 0.5),
        (Attribute::Culture, 0.5),
        (Attribute::Economy, 0.5),
        (Attribute::Military, 0.5),
    ],
    relation_base: 0.1,
    relation_toward: &[],
};

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Expansionist,
        Strategy::Defensive,
        Strategy::Cultural,
        Strategy::Economic,
        Strategy::Balanced,
    ];

    pub fn effect(&self) -> &'static StrategyEffect {
        match self {
            Strategy::Expansionist => &EXPANSIONIST,
            Strategy::Defensive => &DEFENSIVE,
            Strategy::Cultural => &CULTURAL,
            Strategy::Economic => &ECONOMIC,
            Strategy::Balanced => &BALANCED,
        }
    }

    /// Relation drift this strategy pushes toward a civilization following `other`
    pub fn relation_factor(&self, other: Strategy) -> f64 {
        let effect = self.effect();
        let specific: f64 = effect
            .relation_toward
            .iter()
            .filter(|(s, _)| *s == other)
            .map(|(_, v)| v)
            .sum();
        effect.relation_base + specific
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyEntry {
    pub description: String,
    pub year: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Legacy {
    pub achievements: Vec<LegacyEntry>,
    pub cultural_heritage: Vec<LegacyEntry>,
    pub technological_legacy: Vec<LegacyEntry>,
}

impl Legacy {
    pub fn absorb(&mut self, other: &Legacy) {
        self.achievements.extend(other.achievements.iter().cloned());
        self.cultural_heritage.extend(other.cultural_heritage.iter().cloned());
        self.technological_legacy.extend(other.technological_legacy.iter().cloned());
    }

    /// Multiplier on growth of `attr` earned by accumulated legacy
    pub fn bonus(&self, attr: Attribute) -> f64 {
        let achievements = 0.02 * self.achievements.len() as f64;
        match attr {
            Attribute::Tech => 1.0 + 0.05 * self.technological_legacy.len() as f64 + achievements,
            Attribute::Culture => 1.0 + 0.05 * self.cultural_heritage.len() as f64 + achievements,
            _ => 1.0 + achievements,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub year: i32,
    pub from: GridPos,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Civilization {
    pub id: CivId,
    pub name: String,
    pub civ_type: CivType,
    pub strategy: Strategy,
    pub attributes: Attributes,
    pub peak: Attributes,
    pub position: GridPos,
    pub position_history: Vec<MigrationRecord>,
    pub has_migrated: bool,
    pub migration_cooldown: u32,
    pub relations: AHashMap<CivId, f64>,
    pub legacy: Legacy,

    // Health tracking
    pub decline_years: u32,
    pub is_declining: bool,
    pub unstable_years: u32,
    pub is_unstable: bool,
    pub stability: f64,
    pub split_cooldown: u32,

    pub research: ResearchState,
    pub modifiers: GrowthModifiers,
}

impl Civilization {
    /// A freshly founded civilization with a random type and strategy
    pub fn new(id: CivId, name: impl Into<String>, rng: &mut impl Rng) -> Self {
        let civ_type = *CivType::ALL.choose(rng).unwrap_or(&CivType::Agrarian);
        let strategy = *Strategy::ALL.choose(rng).unwrap_or(&Strategy::Balanced);
        let mut base = Attributes::new(
            rng.gen_range(10..40) as f64,
            rng.gen_range(10..40) as f64,
            rng.gen_range(10..40) as f64,
            rng.gen_range(10..40) as f64,
            rng.gen_range(8000..13000) as f64,
        );
        let bonus = civ_type.initial_bonus();
        for attr in Attribute::ALL {
            *base.get_mut(attr) += bonus.get(attr);
        }
        Self::with_attributes(id, name, civ_type, strategy, base)
    }

    /// A successor state (merge, split, revival) with given attributes
    pub fn successor(id: CivId, name: impl Into<String>, attributes: Attributes, rng: &mut impl Rng) -> Self {
        let civ_type = *CivType::ALL.choose(rng).unwrap_or(&CivType::Agrarian);
        let strategy = *Strategy::ALL.choose(rng).unwrap_or(&Strategy::Balanced);
        Self::with_attributes(id, name, civ_type, strategy, attributes)
    }

    pub fn with_attributes(
        id: CivId,
        name: impl Into<String>,
        civ_type: CivType,
        strategy: Strategy,
        attributes: Attributes,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            civ_type,
            strategy,
            attributes,
            peak: attributes,
            position: GridPos::default(),
            position_history: Vec::new(),
            has_migrated: false,
            migration_cooldown: 0,
            relations: AHashMap::new(),
            legacy: Legacy::default(),
            decline_years: 0,
            is_declining: false,
            unstable_years: 0,
            is_unstable: false,
            stability: 100.0,
            split_cooldown: 0,
            research: ResearchState::default(),
            modifiers: GrowthModifiers::default(),
        }
    }

    /// tech + culture + economy + military
    pub fn total_power(&self) -> f64 {
        self.attributes.core_total()
    }

    pub fn peak_power(&self) -> f64 {
        self.peak.core_total()
    }

    pub fn relation_with(&self, other: CivId) -> f64 {
        self.relations.get(&other).copied().unwrap_or(0.0)
    }

    /// One tick of attribute growth plus decline, instability and stability bookkeeping
    pub fn update_stats(&mut self, rng: &mut impl Rng) {
        let base: f64 = rng.gen::<f64>() * 2.0 - 0.5;
        let mut growth = Attributes::new(base, base, base, base, 0.0);

        if self.migration_cooldown > 0 {
            self.migration_cooldown -= 1;
            growth = growth.map(|g| g * 0.8);
        }

        for &(attr, max) in self.strategy.effect().growth_bonus {
            *growth.get_mut(attr) += rng.gen::<f64>() * max;
        }

        let multiplier = self.civ_type.growth_multiplier();
        let before = self.attributes;
        for attr in Attribute::CORE {
            let g = growth.get(attr)
                * multiplier.get(attr)
                * self.legacy.bonus(attr)
                * self.modifiers.growth_factor(attr);
            let value = (self.attributes.get(attr) + g).max(0.0);
            self.attributes.set(attr, value);
        }

        let pop_growth = (self.attributes.economy * 0.01 + self.attributes.tech * 0.005)
            * 100.0
            * multiplier.population
            * self.modifiers.growth_factor(Attribute::Population);
        self.attributes.population = (self.attributes.population + pop_growth).max(0.0);

        for attr in Attribute::ALL {
            if self.attributes.get(attr) > self.peak.get(attr) {
                self.peak.set(attr, self.attributes.get(attr));
            }
        }

        let declined = Attribute::CORE
            .iter()
            .all(|&a| self.attributes.get(a) < before.get(a));
        if declined {
            self.decline_years += 1;
            self.is_declining = self.decline_years >= DECLINE_THRESHOLD;
        } else {
            self.decline_years = 0;
            self.is_declining = false;
        }

        let variance = self.attributes.core_variance();
        if self.attributes.population > 50_000.0 && variance > 100.0 {
            self.is_unstable = true;
            self.unstable_years += 1;
        } else {
            self.is_unstable = false;
            self.unstable_years = 0;
        }

        self.stability = self.compute_stability(variance);
    }

    fn compute_stability(&self, variance: f64) -> f64 {
        let mut stability = 100.0;
        stability -= (self.attributes.population / 10_000.0).floor().min(50.0);
        stability -= (variance / 10.0).floor().min(30.0);
        if self.is_declining {
            stability -= 20.0;
        }
        if self.migration_cooldown > 0 {
            stability -= 15.0;
        }
        stability.clamp(0.0, 100.0)
    }

    /// Relocate, paying a temporary development penalty
    pub fn migrate(&mut self, to: GridPos, year: i32) {
        self.position_history.push(MigrationRecord {
            year,
            from: self.position,
        });
        self.position = to;
        self.has_migrated = true;
        self.migration_cooldown = MIGRATION_COOLDOWN;
        for attr in Attribute::CORE {
            let v = (self.attributes.get(attr) * 0.8).max(10.0);
            self.attributes.set(attr, v);
        }
        self.attributes.population = (self.attributes.population * 0.9).max(5000.0);
    }

    pub fn inherit_legacy(&mut self, other: &Legacy) {
        self.legacy.absorb(other);
    }

    pub fn add_achievement(&mut self, description: impl Into<String>, year: i32) {
        self.legacy.achievements.push(LegacyEntry {
            description: description.into(),
            year,
        });
    }

    pub fn add_cultural_heritage(&mut self, description: impl Into<String>, year: i32) {
        self.legacy.cultural_heritage.push(LegacyEntry {
            description: description.into(),
            year,
        });
    }

    pub fn add_technological_legacy(&mut self, description: impl Into<String>, year: i32) {
        self.legacy.technological_legacy.push(LegacyEntry {
            description: description.into(),
            year,
        });
    }
}

/// Archive record of a collapsed civilization
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeadCivilization {
    pub id: CivId,
    pub name: String,
    pub death_year: i32,
    pub peak: Attributes,
    pub final_attributes: Attributes,
    pub strategy: Strategy,
    pub territory: CellStats,
    pub revived: bool,
}

impl DeadCivilization {
    pub fn from_civilization(civ: &Civilization, death_year: i32, territory: CellStats) -> Self {
        Self {
            id: civ.id,
            name: civ.name.clone(),
            death_year,
            peak: civ.peak,
            final_attributes: civ.attributes,
            strategy: civ.strategy,
            territory,
            revived: false,
        }
    }

    pub fn peak_power(&self) -> f64 {
        self.peak.core_total()
    }
}

/// Name without a trailing generation number
pub fn base_name(name: &str) -> &str {
    name.trim_end_matches(|c: char| c.is_ascii_digit()).trim_end()
}

/// Next name in a lineage: "Nile" -> "Nile 2", "Nile 2" -> "Nile 3"
pub fn successor_name(name: &str) -> String {
    let base = base_name(name);
    let generation = name[base.len()..].trim().parse::<u32>().map(|n| n + 1).unwrap_or(2);
    format!("{} {}", base, generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn civ(strategy: Strategy, attributes: Attributes) -> Civilization {
        Civilization::with_attributes(CivId(1), "Test", CivType::Maritime, strategy, attributes)
    }

    #[test]
    fn test_new_civilization_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for i in 0..50 {
            let c = Civilization::new(CivId(i), "Test", &mut rng);
            let bonus = c.civ_type.initial_bonus();
            let base_tech = c.attributes.tech - bonus.tech;
            assert!((10.0..40.0).contains(&base_tech));
            let base_pop = c.attributes.population - bonus.population;
            assert!((8000.0..13000.0).contains(&base_pop));
            assert_eq!(c.peak, c.attributes);
        }
    }

    #[test]
    fn test_strategy_relation_factors() {
        assert!((Strategy::Expansionist.relation_factor(Strategy::Defensive) + 0.8).abs() < 1e-9);
        assert!((Strategy::Expansionist.relation_factor(Strategy::Cultural) + 0.5).abs() < 1e-9);
        assert!((Strategy::Cultural.relation_factor(Strategy::Cultural) - 0.5).abs() < 1e-9);
        assert!((Strategy::Balanced.relation_factor(Strategy::Economic) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_update_stats_never_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut c = civ(Strategy::Balanced, Attributes::new(0.0, 0.0, 0.0, 0.0, 0.0));
        for _ in 0..200 {
            c.update_stats(&mut rng);
            for attr in Attribute::ALL {
                assert!(c.attributes.get(attr) >= 0.0);
            }
            assert!((0.0..=100.0).contains(&c.stability));
        }
    }

    #[test]
    fn test_peaks_track_maxima() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut c = civ(Strategy::Economic, Attributes::new(20.0, 20.0, 20.0, 20.0, 10_000.0));
        for _ in 0..30 {
            c.update_stats(&mut rng);
            for attr in Attribute::ALL {
                assert!(c.peak.get(attr) >= c.attributes.get(attr));
            }
        }
    }

    #[test]
    fn test_instability_requires_large_unbalanced_population() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut c = civ(Strategy::Balanced, Attributes::new(500.0, 10.0, 10.0, 10.0, 60_000.0));
        c.update_stats(&mut rng);
        assert!(c.is_unstable);
        assert_eq!(c.unstable_years, 1);
        // 100 - 6 (population) - 30 (variance)
        assert!((c.stability - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_migrate_penalties() {
        let mut c = civ(Strategy::Balanced, Attributes::new(100.0, 50.0, 10.0, 12.0, 20_000.0));
        c.position = GridPos::new(3, 3);
        c.migrate(GridPos::new(10, 12), -2500);
        assert!((c.attributes.tech - 80.0).abs() < 1e-9);
        assert!((c.attributes.economy - 10.0).abs() < 1e-9);
        assert!((c.attributes.military - 10.0).abs() < 1e-9);
        assert!((c.attributes.population - 18_000.0).abs() < 1e-9);
        assert_eq!(c.migration_cooldown, 20);
        assert!(c.has_migrated);
        assert_eq!(c.position, GridPos::new(10, 12));
        assert_eq!(c.position_history[0].from, GridPos::new(3, 3));
    }

    #[test]
    fn test_migrate_population_floor() {
        let mut c = civ(Strategy::Balanced, Attributes::new(20.0, 20.0, 20.0, 20.0, 5000.0));
        c.migrate(GridPos::new(1, 1), 0);
        assert!((c.attributes.population - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn test_migration_cooldown_costs_stability() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut c = civ(Strategy::Balanced, Attributes::new(20.0, 20.0, 20.0, 20.0, 5000.0));
        c.migrate(GridPos::new(1, 1), 0);
        c.update_stats(&mut rng);
        assert_eq!(c.migration_cooldown, 19);
        assert!(c.stability <= 85.0);
    }

    #[test]
    fn test_legacy_bonus_and_inheritance() {
        let mut a = civ(Strategy::Balanced, Attributes::default());
        let mut b = civ(Strategy::Balanced, Attributes::default());
        b.add_technological_legacy("Bronze", -2000);
        b.add_achievement("Victory", -1900);
        a.inherit_legacy(&b.legacy);
        assert_eq!(a.legacy.technological_legacy.len(), 1);
        assert!((a.legacy.bonus(Attribute::Tech) - 1.07).abs() < 1e-9);
        assert!((a.legacy.bonus(Attribute::Military) - 1.02).abs() < 1e-9);
    }

    #[test]
    fn test_successor_names() {
        assert_eq!(successor_name("Nile"), "Nile 2");
        assert_eq!(successor_name("Nile 2"), "Nile 3");
        assert_eq!(base_name("Aegean 14"), "Aegean");
    }
}
