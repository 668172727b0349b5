//! Cell resources and their per-type tables

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::Attribute;
use crate::evolution::map::Terrain;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Mineral,
    Food,
    Energy,
    Culture,
    Rare,
}

impl ResourceType {
    /// Generation draw order
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Mineral,
        ResourceType::Food,
        ResourceType::Energy,
        ResourceType::Culture,
        ResourceType::Rare,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceType::Mineral => "Minerals",
            ResourceType::Food => "Food",
            ResourceType::Energy => "Energy",
            ResourceType::Culture => "Cultural relics",
            ResourceType::Rare => "Rare resources",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ResourceType::Mineral => "#8B4513",
            ResourceType::Food => "#32CD32",
            ResourceType::Energy => "#FFD700",
            ResourceType::Culture => "#DDA0DD",
            ResourceType::Rare => "#FF69B4",
        }
    }

    /// Attribute effects, primary effect first
    pub fn effects(&self) -> &'static [(Attribute, f64)] {
        match self {
            ResourceType::Mineral => &[(Attribute::Tech, 0.1), (Attribute::Economy, 0.05)],
            ResourceType::Food => &[(Attribute::Population, 0.15)],
            ResourceType::Energy => &[(Attribute::Economy, 0.1), (Attribute::Tech, 0.05)],
            ResourceType::Culture => &[(Attribute::Culture, 0.2)],
            ResourceType::Rare => &[(Attribute::Tech, 0.15), (Attribute::Culture, 0.1)],
        }
    }

    /// Ceiling enforced by per-tick production and consumption
    pub fn production_cap(&self) -> u32 {
        match self {
            ResourceType::Food => 50,
            ResourceType::Mineral => 35,
            ResourceType::Energy => 30,
            ResourceType::Culture => 25,
            ResourceType::Rare => 15,
        }
    }

    /// Ceiling for stock brought in by trade
    pub fn trade_cap(&self) -> u32 {
        match self {
            ResourceType::Mineral => 120,
            ResourceType::Food => 150,
            ResourceType::Energy => 100,
            ResourceType::Rare => 60,
            ResourceType::Culture => 80,
        }
    }

    pub fn collection_rate(&self) -> f64 {
        match self {
            ResourceType::Food => 0.008,
            ResourceType::Mineral => 0.006,
            ResourceType::Energy => 0.005,
            ResourceType::Culture => 0.004,
            ResourceType::Rare => 0.0025,
        }
    }

    pub fn base_value(&self) -> f64 {
        match self {
            ResourceType::Food => 10.0,
            ResourceType::Mineral => 8.0,
            ResourceType::Energy => 6.0,
            ResourceType::Culture => 5.0,
            ResourceType::Rare => 3.0,
        }
    }

    /// Per-terrain generation probability
    pub fn generation_probability(&self, terrain: Terrain) -> f64 {
        let row: [f64; 5] = match terrain {
            Terrain::Water => [0.01, 0.05, 0.02, 0.01, 0.005],
            Terrain::Plains => [0.05, 0.3, 0.1, 0.05, 0.01],
            Terrain::Forest => [0.1, 0.15, 0.2, 0.1, 0.02],
            Terrain::Hills => [0.25, 0.05, 0.15, 0.08, 0.03],
            Terrain::Mountains => [0.4, 0.02, 0.1, 0.15, 0.05],
        };
        row[*self as usize]
    }
}

/// A resource deposit on a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceType,
    pub quantity: u32,
}

impl Resource {
    pub fn new(kind: ResourceType, quantity: u32) -> Self {
        Self { kind, quantity }
    }

    /// Roll at most one deposit for a freshly generated cell
    pub fn generate(terrain: Terrain, rng: &mut impl Rng) -> Option<Resource> {
        let roll: f64 = rng.gen();
        let mut cumulative = 0.0;
        for kind in ResourceType::ALL {
            cumulative += kind.generation_probability(terrain);
            if roll < cumulative {
                return Some(Resource::new(kind, rng.gen_range(1..=5)));
            }
        }
        None
    }

    /// Primary effect weight times quantity
    pub fn effect_value(&self) -> f64 {
        self.kind
            .effects()
            .first()
            .map(|(_, w)| w * self.quantity as f64)
            .unwrap_or(0.0)
    }
}

/// Resource quantities summed by type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTally {
    pub mineral: u32,
    pub food: u32,
    pub energy: u32,
    pub culture: u32,
    pub rare: u32,
}

impl ResourceTally {
    pub fn get(&self, kind: ResourceType) -> u32 {
        match kind {
            ResourceType::Mineral => self.mineral,
            ResourceType::Food => self.food,
            ResourceType::Energy => self.energy,
            ResourceType::Culture => self.culture,
            ResourceType::Rare => self.rare,
        }
    }

    pub fn add(&mut self, kind: ResourceType, amount: u32) {
        let slot = match kind {
            ResourceType::Mineral => &mut self.mineral,
            ResourceType::Food => &mut self.food,
            ResourceType::Energy => &mut self.energy,
            ResourceType::Culture => &mut self.culture,
            ResourceType::Rare => &mut self.rare,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn total(&self) -> u32 {
        ResourceType::ALL.iter().map(|&k| self.get(k)).sum()
    }
}
