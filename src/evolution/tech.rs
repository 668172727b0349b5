//! Technology catalog and per-civilization research
//!
//! The catalog is an external JSON document loaded once at startup. A missing or
//! malformed catalog degrades to an empty tree, which turns research into a no-op.

use std::collections::BTreeMap;

use ahash::AHashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::Attribute;
use crate::evolution::civilization::Civilization;
use crate::evolution::resource::{ResourceTally, ResourceType};

/// Progress needed to finish a technology
pub const RESEARCH_COMPLETE: f64 = 100.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub cost: BTreeMap<ResourceType, u32>,
    #[serde(default)]
    pub effects: BTreeMap<String, f64>,
    #[serde(default)]
    pub unlocks: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TechTree {
    #[serde(default)]
    pub techs: Vec<TechDefinition>,
}

impl TechTree {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a local path or an http(s) URL
    pub async fn load(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let tree = Client::new()
                .get(source)
                .send()
                .await?
                .error_for_status()?
                .json::<TechTree>()
                .await?;
            Ok(tree)
        } else {
            let content = tokio::fs::read_to_string(source).await?;
            Self::from_json_str(&content)
        }
    }

    /// Like `load`, but any failure yields an empty tree
    pub async fn load_or_empty(source: &str) -> Self {
        match Self::load(source).await {
            Ok(tree) => {
                tracing::info!("Loaded {} technologies from {}", tree.techs.len(), source);
                tree
            }
            Err(e) => {
                tracing::warn!("Tech tree unavailable ({}): {} - research disabled", source, e);
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.techs.is_empty()
    }
}

/// Named research modifiers a technology can grant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechEffect {
    PopulationGrowth,
    FoodProduction,
    FoodEfficiency,
    MineralProduction,
    EnergyProduction,
    EnergyEfficiency,
    CultureGrowth,
    TechResearch,
    EconomyGrowth,
    MilitaryStrength,
    TradeEfficiency,
    PopulationCap,
    CityDefense,
    GlobalAwareness,
}

impl TechEffect {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "population_growth" => TechEffect::PopulationGrowth,
            "food_production" => TechEffect::FoodProduction,
            "food_efficiency" => TechEffect::FoodEfficiency,
            "mineral_production" => TechEffect::MineralProduction,
            "energy_production" => TechEffect::EnergyProduction,
            "energy_efficiency" => TechEffect::EnergyEfficiency,
            "culture_growth" => TechEffect::CultureGrowth,
            "tech_research" => TechEffect::TechResearch,
            "economy_growth" => TechEffect::EconomyGrowth,
            "military_strength" => TechEffect::MilitaryStrength,
            "trade_efficiency" => TechEffect::TradeEfficiency,
            "population_cap" => TechEffect::PopulationCap,
            "city_defense" => TechEffect::CityDefense,
            "global_awareness" => TechEffect::GlobalAwareness,
            _ => return None,
        })
    }
}

/// Accumulated research modifiers of one civilization
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthModifiers {
    pub population_growth: f64,
    pub food_production: f64,
    pub food_efficiency: f64,
    pub mineral_production: f64,
    pub energy_production: f64,
    pub energy_efficiency: f64,
    pub culture_growth: f64,
    pub economy_growth: f64,
    pub military_strength: f64,
    pub trade_efficiency: f64,
    pub population_cap: f64,
    pub city_defense: f64,
    pub global_awareness: f64,
}

impl GrowthModifiers {
    fn slot_mut(&mut self, effect: TechEffect) -> Option<&mut f64> {
        Some(match effect {
            TechEffect::PopulationGrowth => &mut self.population_growth,
            TechEffect::FoodProduction => &mut self.food_production,
            TechEffect::FoodEfficiency => &mut self.food_efficiency,
            TechEffect::MineralProduction => &mut self.mineral_production,
            TechEffect::EnergyProduction => &mut self.energy_production,
            TechEffect::EnergyEfficiency => &mut self.energy_efficiency,
            TechEffect::CultureGrowth => &mut self.culture_growth,
            TechEffect::EconomyGrowth => &mut self.economy_growth,
            TechEffect::MilitaryStrength => &mut self.military_strength,
            TechEffect::TradeEfficiency => &mut self.trade_efficiency,
            TechEffect::PopulationCap => &mut self.population_cap,
            TechEffect::CityDefense => &mut self.city_defense,
            TechEffect::GlobalAwareness => &mut self.global_awareness,
            TechEffect::TechResearch => return None,
        })
    }

    /// Multiplier on per-tick growth of `attr`
    pub fn growth_factor(&self, attr: Attribute) -> f64 {
        match attr {
            Attribute::Tech => 1.0,
            Attribute::Culture => 1.0 + self.culture_growth,
            Attribute::Economy => 1.0 + self.economy_growth,
            Attribute::Military => 1.0 + self.military_strength,
            Attribute::Population => 1.0 + self.population_growth,
        }
    }

    /// Multiplier on cell collection of `kind`
    pub fn production_factor(&self, kind: ResourceType) -> f64 {
        match kind {
            ResourceType::Food => 1.0 + self.food_production,
            ResourceType::Mineral => 1.0 + self.mineral_production,
            ResourceType::Energy => 1.0 + self.energy_production,
            ResourceType::Culture | ResourceType::Rare => 1.0,
        }
    }
}

/// Research progress of one civilization
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    pub researched: Vec<String>,
    pub researching: Option<String>,
    pub progress: f64,
    pub research_speed: f64,
    pub unlocked_features: Vec<String>,
}

impl Default for ResearchState {
    fn default() -> Self {
        Self {
            researched: Vec::new(),
            researching: None,
            progress: 0.0,
            research_speed: 1.0,
            unlocked_features: Vec::new(),
        }
    }
}

impl ResearchState {
    pub fn has_researched(&self, tech_id: &str) -> bool {
        self.researched.iter().any(|t| t == tech_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechStatus {
    Researched,
    Researching,
    Available,
    Unavailable,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechSummary {
    pub researched_count: usize,
    pub total_techs: usize,
    pub researching: Option<String>,
    pub progress: f64,
    pub research_speed: f64,
    pub unlocked_features: Vec<String>,
}

/// Research rules over a loaded catalog
#[derive(Clone, Debug, Default)]
pub struct TechSystem {
    tree: TechTree,
    index: AHashMap<String, usize>,
}

impl TechSystem {
    pub fn new(tree: TechTree) -> Self {
        let index = tree
            .techs
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self { tree, index }
    }

    pub fn tree(&self) -> &TechTree {
        &self.tree
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn tech_details(&self, tech_id: &str) -> Option<&TechDefinition> {
        self.index.get(tech_id).map(|&i| &self.tree.techs[i])
    }

    fn dependencies_met(&self, tech: &TechDefinition, state: &ResearchState) -> bool {
        tech.dependencies.iter().all(|d| state.has_researched(d))
    }

    /// Not researched, not in progress, and every dependency researched
    pub fn available_techs(&self, civ: &Civilization) -> Vec<&TechDefinition> {
        let state = &civ.research;
        self.tree
            .techs
            .iter()
            .filter(|t| !state.has_researched(&t.id))
            .filter(|t| state.researching.as_deref() != Some(t.id.as_str()))
            .filter(|t| self.dependencies_met(t, state))
            .collect()
    }

    pub fn can_afford(&self, tech: &TechDefinition, resources: &ResourceTally) -> bool {
        tech.cost.iter().all(|(&kind, &amount)| resources.get(kind) >= amount)
    }

    /// Cost is checked and reported; stockpiles live on cells and are left untouched
    fn pay_resource_cost(&self, civ: &Civilization, tech: &TechDefinition) {
        tracing::debug!(
            "{} commits {:?} to research {}",
            civ.name,
            tech.cost,
            tech.name
        );
    }

    pub fn start_research(&self, civ: &mut Civilization, tech_id: &str, resources: &ResourceTally) -> bool {
        let Some(tech) = self.tech_details(tech_id) else {
            return false;
        };
        if civ.research.has_researched(tech_id) || civ.research.researching.is_some() {
            return false;
        }
        if !self.dependencies_met(tech, &civ.research) || !self.can_afford(tech, resources) {
            return false;
        }
        self.pay_resource_cost(civ, tech);
        civ.research.researching = Some(tech.id.clone());
        civ.research.progress = 0.0;
        true
    }

    pub fn research_points(&self, civ: &Civilization) -> f64 {
        let base = civ.attributes.tech / 20.0
            + civ.attributes.population / 500.0
            + civ.research.researched.len() as f64 * 0.5;
        base * civ.research.research_speed
    }

    /// Advance the active project; returns the technology if it completed this step
    pub fn update_research(&self, civ: &mut Civilization, delta: f64) -> Option<TechDefinition> {
        let tech_id = civ.research.researching.clone()?;
        let points = self.research_points(civ);
        civ.research.progress += points * delta;
        if civ.research.progress >= RESEARCH_COMPLETE {
            return self.complete_research(civ, &tech_id).ok();
        }
        None
    }

    pub fn complete_research(&self, civ: &mut Civilization, tech_id: &str) -> Result<TechDefinition> {
        let tech = self
            .tech_details(tech_id)
            .ok_or_else(|| SimError::UnknownTech(tech_id.to_string()))?
            .clone();

        civ.research.researched.push(tech.id.clone());
        civ.research.researching = None;
        civ.research.progress = 0.0;

        for (name, &delta) in &tech.effects {
            match TechEffect::parse(name) {
                Some(TechEffect::TechResearch) => civ.research.research_speed += delta,
                Some(effect) => {
                    if let Some(slot) = civ.modifiers.slot_mut(effect) {
                        *slot += delta;
                    }
                }
                None => tracing::debug!("Ignoring unknown tech effect '{}'", name),
            }
        }

        for feature in &tech.unlocks {
            if !civ.research.unlocked_features.contains(feature) {
                civ.research.unlocked_features.push(feature.clone());
            }
        }

        Ok(tech)
    }

    pub fn tech_status(&self, tech_id: &str, civ: &Civilization) -> TechStatus {
        let Some(tech) = self.tech_details(tech_id) else {
            return TechStatus::Unknown;
        };
        let state = &civ.research;
        if state.has_researched(tech_id) {
            TechStatus::Researched
        } else if state.researching.as_deref() == Some(tech_id) {
            TechStatus::Researching
        } else if self.dependencies_met(tech, state) {
            TechStatus::Available
        } else {
            TechStatus::Unavailable
        }
    }

    pub fn summary(&self, civ: &Civilization) -> TechSummary {
        TechSummary {
            researched_count: civ.research.researched.len(),
            total_techs: self.tree.techs.len(),
            researching: civ.research.researching.clone(),
            progress: civ.research.progress,
            research_speed: civ.research.research_speed,
            unlocked_features: civ.research.unlocked_features.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Attributes, CivId};
    use crate::evolution::civilization::{CivType, Strategy};

    const TREE: &str = r#"{
        "techs": [
            { "id": "agriculture", "name": "Agriculture", "cost": { "food": 10 },
              "effects": { "population_growth": 0.1, "food_production": 0.2 }, "unlocks": ["granary"] },
            { "id": "writing", "name": "Writing", "dependencies": ["agriculture"],
              "effects": { "tech_research": 0.25, "mystery": 9.0 } }
        ]
    }"#;

    fn system() -> TechSystem {
        TechSystem::new(TechTree::from_json_str(TREE).unwrap())
    }

    fn civ() -> Civilization {
        Civilization::with_attributes(
            CivId(1),
            "Test",
            CivType::Agrarian,
            Strategy::Balanced,
            Attributes::new(40.0, 20.0, 20.0, 20.0, 10_000.0),
        )
    }

    fn rich() -> ResourceTally {
        ResourceTally { food: 50, ..Default::default() }
    }

    #[test]
    fn test_available_respects_dependencies() {
        let sys = system();
        let c = civ();
        let ids: Vec<_> = sys.available_techs(&c).iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["agriculture".to_string()]);
        assert_eq!(sys.tech_status("writing", &c), TechStatus::Unavailable);
        assert_eq!(sys.tech_status("bronze", &c), TechStatus::Unknown);
    }

    #[test]
    fn test_start_research_checks_cost() {
        let sys = system();
        let mut c = civ();
        assert!(!sys.start_research(&mut c, "agriculture", &ResourceTally::default()));
        assert!(!sys.start_research(&mut c, "writing", &rich()));
        assert!(sys.start_research(&mut c, "agriculture", &rich()));
        assert_eq!(sys.tech_status("agriculture", &c), TechStatus::Researching);
        assert!(sys.available_techs(&c).is_empty());
    }

    #[test]
    fn test_research_points() {
        let sys = system();
        let c = civ();
        // 40/20 + 10000/500
        assert!((sys.research_points(&c) - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_research_completes_and_applies_effects() {
        let sys = system();
        let mut c = civ();
        assert!(sys.start_research(&mut c, "agriculture", &rich()));
        let mut completed = None;
        for _ in 0..10 {
            if let Some(t) = sys.update_research(&mut c, 1.0) {
                completed = Some(t);
                break;
            }
        }
        assert_eq!(completed.map(|t| t.id), Some("agriculture".to_string()));
        assert!(c.research.researching.is_none());
        assert_eq!(c.research.progress, 0.0);
        assert!((c.modifiers.population_growth - 0.1).abs() < 1e-9);
        assert!((c.modifiers.production_factor(ResourceType::Food) - 1.2).abs() < 1e-9);
        assert_eq!(c.research.unlocked_features, vec!["granary".to_string()]);
        assert_eq!(sys.tech_status("writing", &c), TechStatus::Available);
    }

    #[test]
    fn test_tech_research_effect_raises_speed() {
        let sys = system();
        let mut c = civ();
        c.research.researched.push("agriculture".into());
        sys.complete_research(&mut c, "writing").unwrap();
        assert!((c.research.research_speed - 1.25).abs() < 1e-9);
        let summary = sys.summary(&c);
        assert_eq!(summary.researched_count, 2);
        assert_eq!(summary.total_techs, 2);
    }

    #[test]
    fn test_empty_tree_is_inert() {
        let sys = TechSystem::default();
        let mut c = civ();
        assert!(sys.available_techs(&c).is_empty());
        assert!(sys.update_research(&mut c, 1.0).is_none());
        assert!(matches!(sys.complete_research(&mut c, "x"), Err(SimError::UnknownTech(_))));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(TechTree::from_json_str("{ not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_degrades_to_empty() {
        let tree = TechTree::load_or_empty("/nonexistent/tech-tree.json").await;
        assert!(tree.is_empty());
    }
}
