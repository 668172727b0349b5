//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Unique identifier for civilizations, never reused within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CivId(pub u32);

impl std::fmt::Display for CivId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Grid coordinate (column, row)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

impl GridPos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: &Self) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn euclidean(&self, other: &Self) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// The five developmental attributes shared by civilizations and cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Tech,
    Culture,
    Economy,
    Military,
    Population,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::Tech,
        Attribute::Culture,
        Attribute::Economy,
        Attribute::Military,
        Attribute::Population,
    ];

    /// Everything except population
    pub const CORE: [Attribute; 4] = [
        Attribute::Tech,
        Attribute::Culture,
        Attribute::Economy,
        Attribute::Military,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Tech => "tech",
            Attribute::Culture => "culture",
            Attribute::Economy => "economy",
            Attribute::Military => "military",
            Attribute::Population => "population",
        }
    }
}

/// A bundle of the five attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub tech: f64,
    pub culture: f64,
    pub economy: f64,
    pub military: f64,
    pub population: f64,
}

impl Attributes {
    pub const fn new(tech: f64, culture: f64, economy: f64, military: f64, population: f64) -> Self {
        Self {
            tech,
            culture,
            economy,
            military,
            population,
        }
    }

    pub fn get(&self, attr: Attribute) -> f64 {
        match attr {
            Attribute::Tech => self.tech,
            Attribute::Culture => self.culture,
            Attribute::Economy => self.economy,
            Attribute::Military => self.military,
            Attribute::Population => self.population,
        }
    }

    pub fn get_mut(&mut self, attr: Attribute) -> &mut f64 {
        match attr {
            Attribute::Tech => &mut self.tech,
            Attribute::Culture => &mut self.culture,
            Attribute::Economy => &mut self.economy,
            Attribute::Military => &mut self.military,
            Attribute::Population => &mut self.population,
        }
    }

    pub fn set(&mut self, attr: Attribute, value: f64) {
        *self.get_mut(attr) = value;
    }

    /// Apply `f` to every attribute
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(
            f(self.tech),
            f(self.culture),
            f(self.economy),
            f(self.military),
            f(self.population),
        )
    }

    /// tech + culture + economy + military
    pub fn core_total(&self) -> f64 {
        self.tech + self.culture + self.economy + self.military
    }

    /// Gap between the largest and smallest core attribute
    pub fn core_spread(&self) -> f64 {
        let values = [self.tech, self.culture, self.economy, self.military];
        let max = values.iter().cloned().fold(f64::MIN, f64::max);
        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        max - min
    }

    /// Sum of absolute deviations of the core attributes from their mean
    pub fn core_variance(&self) -> f64 {
        let mean = self.core_total() / 4.0;
        Attribute::CORE
            .iter()
            .map(|&a| (self.get(a) - mean).abs())
            .sum()
    }

    /// Equal-weight blend that counts population in hundreds
    pub fn local_strength(&self) -> f64 {
        (self.core_total() + self.population / 100.0) / 5.0
    }

    /// Clamp each attribute into `[0, limit]`
    pub fn clamp_to(&mut self, limits: &Attributes) {
        for attr in Attribute::ALL {
            let v = self.get(attr).max(0.0).min(limits.get(attr));
            self.set(attr, v);
        }
    }
}
