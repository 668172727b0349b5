//! Terrain grid and territory cells
//!
//! The map is a row-major grid of `TerritoryCell`s. Terrain is immutable after
//! generation; ownership, attributes, resources and influence change every tick.

use std::collections::{BTreeMap, VecDeque};

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{Attribute, Attributes, CivId, GridPos};
use crate::evolution::resource::Resource;

const SMOOTHING_PASSES: usize = 3;
const MIN_REVIVAL_AREA: usize = 5;

const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Water,
    Plains,
    Forest,
    Hills,
    Mountains,
}

impl Terrain {
    pub const ALL: [Terrain; 5] = [
        Terrain::Water,
        Terrain::Plains,
        Terrain::Forest,
        Terrain::Hills,
        Terrain::Mountains,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Terrain::Water => "Ocean",
            Terrain::Plains => "Plains",
            Terrain::Forest => "Forest",
            Terrain::Hills => "Hills",
            Terrain::Mountains => "Mountains",
        }
    }

    pub fn is_land(&self) -> bool {
        *self != Terrain::Water
    }

    /// Upper bound for each cell attribute on this terrain
    pub fn limits(&self) -> Attributes {
        match self {
            Terrain::Water => Attributes::new(10.0, 10.0, 5.0, 5.0, 100.0),
            Terrain::Plains => Attributes::new(50.0, 50.0, 100.0, 70.0, 1000.0),
            Terrain::Forest => Attributes::new(30.0, 80.0, 30.0, 50.0, 500.0),
            Terrain::Hills => Attributes::new(40.0, 40.0, 40.0, 100.0, 300.0),
            Terrain::Mountains => Attributes::new(100.0, 30.0, 20.0, 80.0, 100.0),
        }
    }

    /// Resistance to influence diffusion; neighbours weigh `1 - obstacle`
    pub fn influence_obstacle(&self) -> f64 {
        match self {
            Terrain::Water => 0.0,
            Terrain::Plains => 0.2,
            Terrain::Forest => 0.5,
            Terrain::Hills => 0.7,
            Terrain::Mountains => 0.9,
        }
    }

    /// Multiplier on influence projected into a cell of this terrain
    pub fn influence_modifier(&self) -> f64 {
        match self {
            Terrain::Plains => 1.1,
            Terrain::Forest => 0.7,
            Terrain::Hills => 0.5,
            Terrain::Mountains => 0.3,
            Terrain::Water => 1.0,
        }
    }

    /// How strongly each civilization attribute settles on this terrain
    pub fn distribution_weights(&self) -> Attributes {
        match self {
            Terrain::Water => Attributes::new(0.2, 0.2, 0.1, 0.1, 0.1),
            Terrain::Plains => Attributes::new(0.8, 0.8, 1.5, 1.2, 1.5),
            Terrain::Forest => Attributes::new(0.5, 1.5, 0.5, 0.8, 0.8),
            Terrain::Hills => Attributes::new(0.7, 0.7, 0.7, 1.5, 0.5),
            Terrain::Mountains => Attributes::new(1.5, 0.5, 0.3, 1.2, 0.2),
        }
    }

    fn from_roll(r: f64) -> Terrain {
        if r < 0.3 {
            Terrain::Water
        } else if r < 0.5 {
            Terrain::Plains
        } else if r < 0.7 {
            Terrain::Forest
        } else if r < 0.85 {
            Terrain::Hills
        } else {
            Terrain::Mountains
        }
    }

    fn random_land(rng: &mut impl Rng) -> Terrain {
        let r: f64 = rng.gen();
        if r < 0.4 {
            Terrain::Plains
        } else if r < 0.7 {
            Terrain::Forest
        } else if r < 0.9 {
            Terrain::Hills
        } else {
            Terrain::Mountains
        }
    }
}

/// Independent per-cell terrain draw (30% water, 20% plains, 20% forest, 15% hills, 15% mountains)
pub fn draw_raw_terrain(cols: usize, rows: usize, rng: &mut impl Rng) -> Vec<Terrain> {
    (0..cols * rows).map(|_| Terrain::from_roll(rng.gen())).collect()
}

/// One cellular-automaton pass over the in-bounds 3x3 window of every cell
pub fn smooth_terrain(terrain: &[Terrain], cols: usize, rows: usize, rng: &mut impl Rng) -> Vec<Terrain> {
    let mut next = terrain.to_vec();
    for y in 0..rows {
        for x in 0..cols {
            let mut water = 0;
            let mut land = 0;
            for ny in y.saturating_sub(1)..=(y + 1).min(rows - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(cols - 1) {
                    if terrain[ny * cols + nx] == Terrain::Water {
                        water += 1;
                    } else {
                        land += 1;
                    }
                }
            }
            if water > 5 {
                next[y * cols + x] = Terrain::Water;
            } else if land > 5 {
                next[y * cols + x] = Terrain::random_land(rng);
            }
        }
    }
    next
}

/// One grid cell
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerritoryCell {
    pub terrain: Terrain,
    pub owner: Option<CivId>,
    pub disputed: bool,
    pub attributes: Attributes,
    pub limits: Attributes,
    pub resource: Option<Resource>,
    /// Last computed influence per civilization
    #[serde(skip)]
    pub influence: AHashMap<CivId, f64>,
}

impl TerritoryCell {
    pub fn new(terrain: Terrain, resource: Option<Resource>) -> Self {
        Self {
            terrain,
            owner: None,
            disputed: false,
            attributes: Attributes::default(),
            limits: terrain.limits(),
            resource,
            influence: AHashMap::new(),
        }
    }

    pub fn is_owned_by(&self, civ: CivId) -> bool {
        self.owner == Some(civ)
    }

    /// Owned by `civ` and not contested
    pub fn is_held_by(&self, civ: CivId) -> bool {
        self.owner == Some(civ) && !self.disputed
    }

    pub fn clamp_attributes(&mut self) {
        let limits = self.limits;
        self.attributes.clamp_to(&limits);
    }

    /// Drop ownership and any influence bookkeeping
    pub fn release(&mut self) {
        self.owner = None;
        self.disputed = false;
        self.influence.clear();
    }

    /// Local strength relative to the strength of a fully developed cell, in `[0, 1]`
    pub fn power_intensity(&self) -> f64 {
        let max = self.limits.local_strength();
        if max <= 0.0 {
            return 0.0;
        }
        (self.attributes.local_strength() / max).min(1.0)
    }
}

/// Per-civilization territory statistics
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CellStats {
    pub total_cells: usize,
    pub disputed_cells: usize,
    pub terrain_counts: BTreeMap<Terrain, usize>,
    pub average_attributes: Attributes,
}

/// The world grid
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldMap {
    pub cols: usize,
    pub rows: usize,
    pub cells: Vec<TerritoryCell>,
}

impl WorldMap {
    /// Draw, smooth and initialize a fresh map
    pub fn generate(cols: usize, rows: usize, rng: &mut impl Rng) -> Self {
        let mut terrain = draw_raw_terrain(cols, rows, rng);
        for _ in 0..SMOOTHING_PASSES {
            terrain = smooth_terrain(&terrain, cols, rows, rng);
        }
        Self::from_terrain(cols, rows, terrain, rng)
    }

    /// Build cells for a given terrain layout, rolling resources on land
    pub fn from_terrain(cols: usize, rows: usize, terrain: Vec<Terrain>, rng: &mut impl Rng) -> Self {
        debug_assert_eq!(terrain.len(), cols * rows);
        let cells = terrain
            .into_iter()
            .map(|t| {
                // Water never carries deposits
                let resource = if t.is_land() { Resource::generate(t, rng) } else { None };
                TerritoryCell::new(t, resource)
            })
            .collect();
        Self { cols, rows, cells }
    }

    pub fn index(&self, pos: GridPos) -> usize {
        pos.y * self.cols + pos.x
    }

    pub fn pos_of(&self, index: usize) -> GridPos {
        GridPos::new(index % self.cols, index / self.cols)
    }

    pub fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows
    }

    pub fn cell(&self, pos: GridPos) -> &TerritoryCell {
        &self.cells[self.index(pos)]
    }

    pub fn cell_mut(&mut self, pos: GridPos) -> &mut TerritoryCell {
        let i = self.index(pos);
        &mut self.cells[i]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&TerritoryCell> {
        if x < self.cols && y < self.rows {
            Some(&self.cells[y * self.cols + x])
        } else {
            None
        }
    }

    /// All positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = GridPos> {
        let cols = self.cols;
        (0..self.cells.len()).map(move |i| GridPos::new(i % cols, i / cols))
    }

    /// In-bounds 8-neighbourhood
    pub fn neighbors8(&self, pos: GridPos) -> impl Iterator<Item = GridPos> {
        let (cols, rows) = (self.cols as isize, self.rows as isize);
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let nx = pos.x as isize + dx;
            let ny = pos.y as isize + dy;
            (nx >= 0 && ny >= 0 && nx < cols && ny < rows).then(|| GridPos::new(nx as usize, ny as usize))
        })
    }

    pub fn land_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.terrain.is_land()).count()
    }

    /// Cells owned by `civ`, optionally including disputed ones
    pub fn owned_cells(&self, civ: CivId, include_disputed: bool) -> Vec<GridPos> {
        self.positions()
            .filter(|&p| {
                let cell = self.cell(p);
                cell.is_owned_by(civ) && (include_disputed || !cell.disputed)
            })
            .collect()
    }

    /// Claim a rough 5x5 patch around `center`, densest at the centre
    pub fn assign_initial_territory(&mut self, civ: CivId, center: GridPos, rng: &mut impl Rng) -> usize {
        let mut claimed = 0;
        for dy in -2isize..=2 {
            for dx in -2isize..=2 {
                let x = center.x as isize + dx;
                let y = center.y as isize + dy;
                if !self.in_bounds(x, y) {
                    continue;
                }
                let pos = GridPos::new(x as usize, y as usize);
                if !self.cell(pos).terrain.is_land() {
                    continue;
                }
                let distance = (dx.abs() + dy.abs()) as f64;
                if distance == 0.0 || rng.gen::<f64>() < (-distance / 1.5).exp() {
                    let cell = self.cell_mut(pos);
                    cell.owner = Some(civ);
                    cell.disputed = false;
                    cell.attributes = cell.limits.map(|l| l * 0.3);
                    claimed += 1;
                }
            }
        }
        claimed
    }

    /// Centroid of a connected patch of at least five free land cells
    ///
    /// Returns `None` without touching the RNG when fewer than five free cells exist.
    pub fn find_suitable_area_for_revival(&self, rng: &mut impl Rng) -> Option<GridPos> {
        let mut free: Vec<GridPos> = self
            .positions()
            .filter(|&p| {
                let cell = self.cell(p);
                cell.owner.is_none() && !cell.disputed && cell.terrain.is_land()
            })
            .collect();
        if free.len() < MIN_REVIVAL_AREA {
            return None;
        }
        free.shuffle(rng);

        let is_free = |p: GridPos| {
            let cell = self.cell(p);
            cell.owner.is_none() && !cell.disputed && cell.terrain.is_land()
        };
        let mut visited = vec![false; self.cells.len()];

        for &start in &free {
            if visited[self.index(start)] {
                continue;
            }
            let mut area = Vec::new();
            let mut queue = VecDeque::from([start]);
            visited[self.index(start)] = true;
            while let Some(pos) = queue.pop_front() {
                area.push(pos);
                for n in self.neighbors8(pos) {
                    let i = self.index(n);
                    if !visited[i] && is_free(n) {
                        visited[i] = true;
                        queue.push_back(n);
                    }
                }
            }
            if area.len() >= MIN_REVIVAL_AREA {
                return centroid(&area);
            }
        }
        None
    }

    /// `a`'s cells that touch a cell owned by `b`
    pub fn adjacent_cells_between(&self, a: CivId, b: CivId) -> Vec<GridPos> {
        self.positions()
            .filter(|&p| self.cell(p).is_owned_by(a) && self.touches(p, b))
            .collect()
    }

    pub fn are_adjacent(&self, a: CivId, b: CivId) -> bool {
        self.positions()
            .any(|p| self.cell(p).is_owned_by(a) && self.touches(p, b))
    }

    fn touches(&self, pos: GridPos, civ: CivId) -> bool {
        self.neighbors8(pos).any(|n| self.cell(n).is_owned_by(civ))
    }

    /// Unown every cell held by `civ`
    pub fn release_territory(&mut self, civ: CivId) {
        for cell in self.cells.iter_mut().filter(|c| c.is_owned_by(civ)) {
            cell.release();
        }
    }

    /// Hand every cell of `from` to `to`
    pub fn transfer_territory(&mut self, from: CivId, to: CivId) {
        for cell in self.cells.iter_mut().filter(|c| c.is_owned_by(from)) {
            cell.owner = Some(to);
        }
    }

    pub fn cell_stats(&self, civ: CivId) -> CellStats {
        let mut stats = CellStats::default();
        let mut sum = Attributes::default();
        for cell in self.cells.iter().filter(|c| c.is_owned_by(civ)) {
            stats.total_cells += 1;
            if cell.disputed {
                stats.disputed_cells += 1;
            }
            *stats.terrain_counts.entry(cell.terrain).or_insert(0) += 1;
            for attr in Attribute::ALL {
                *sum.get_mut(attr) += cell.attributes.get(attr);
            }
        }
        if stats.total_cells > 0 {
            let n = stats.total_cells as f64;
            stats.average_attributes = sum.map(|v| v / n);
        }
        stats
    }
}

/// Rounded mean position
pub fn centroid(cells: &[GridPos]) -> Option<GridPos> {
    if cells.is_empty() {
        return None;
    }
    let n = cells.len() as f64;
    let sx: usize = cells.iter().map(|p| p.x).sum();
    let sy: usize = cells.iter().map(|p| p.y).sum();
    Some(GridPos::new(
        (sx as f64 / n).round() as usize,
        (sy as f64 / n).round() as usize,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn plains_map(cols: usize, rows: usize) -> WorldMap {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        WorldMap::from_terrain(cols, rows, vec![Terrain::Plains; cols * rows], &mut rng)
    }

    #[test]
    fn test_raw_terrain_proportions() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let terrain = draw_raw_terrain(100, 100, &mut rng);
        let water = terrain.iter().filter(|&&t| t == Terrain::Water).count() as f64 / 10_000.0;
        let hills = terrain.iter().filter(|&&t| t == Terrain::Hills).count() as f64 / 10_000.0;
        assert!((water - 0.30).abs() < 0.02, "water fraction {}", water);
        assert!((hills - 0.15).abs() < 0.02, "hills fraction {}", hills);
    }

    #[test]
    fn test_smoothing_floods_water_majority() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut terrain = vec![Terrain::Water; 9];
        terrain[4] = Terrain::Mountains;
        let smoothed = smooth_terrain(&terrain, 3, 3, &mut rng);
        assert_eq!(smoothed[4], Terrain::Water);
    }

    #[test]
    fn test_water_has_no_resources() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let map = WorldMap::generate(60, 60, &mut rng);
        assert!(map
            .cells
            .iter()
            .filter(|c| c.terrain == Terrain::Water)
            .all(|c| c.resource.is_none()));
    }

    #[test]
    fn test_initial_territory_claims_center_at_thirty_percent() {
        let mut map = plains_map(10, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let claimed = map.assign_initial_territory(CivId(1), GridPos::new(5, 5), &mut rng);
        assert!(claimed >= 1);
        let center = map.cell(GridPos::new(5, 5));
        assert_eq!(center.owner, Some(CivId(1)));
        assert!((center.attributes.population - 300.0).abs() < 1e-9);
        assert!((center.attributes.economy - 30.0).abs() < 1e-9);
        // Nothing beyond the 5x5 square
        assert!(map.owned_cells(CivId(1), true).iter().all(|p| p.x.abs_diff(5) <= 2 && p.y.abs_diff(5) <= 2));
    }

    #[test]
    fn test_initial_territory_skips_water() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut map = WorldMap::from_terrain(5, 5, vec![Terrain::Water; 25], &mut rng);
        assert_eq!(map.assign_initial_territory(CivId(1), GridPos::new(2, 2), &mut rng), 0);
    }

    #[test]
    fn test_revival_area_requires_five_cells() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut terrain = vec![Terrain::Water; 25];
        for i in [0, 1, 2, 3] {
            terrain[i] = Terrain::Plains;
        }
        let map = WorldMap::from_terrain(5, 5, terrain, &mut rng);
        assert!(map.find_suitable_area_for_revival(&mut rng).is_none());
        assert!(map.find_suitable_area_for_revival(&mut rng).is_none());
    }

    #[test]
    fn test_revival_area_centroid() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut terrain = vec![Terrain::Water; 25];
        for x in 0..5 {
            terrain[2 * 5 + x] = Terrain::Plains;
        }
        let map = WorldMap::from_terrain(5, 5, terrain, &mut rng);
        assert_eq!(map.find_suitable_area_for_revival(&mut rng), Some(GridPos::new(2, 2)));
    }

    #[test]
    fn test_adjacency_between_civs() {
        let mut map = plains_map(4, 1);
        map.cell_mut(GridPos::new(0, 0)).owner = Some(CivId(1));
        map.cell_mut(GridPos::new(1, 0)).owner = Some(CivId(1));
        map.cell_mut(GridPos::new(2, 0)).owner = Some(CivId(2));
        assert_eq!(map.adjacent_cells_between(CivId(1), CivId(2)), vec![GridPos::new(1, 0)]);
        assert!(map.are_adjacent(CivId(2), CivId(1)));
        assert!(!map.are_adjacent(CivId(1), CivId(3)));
    }

    #[test]
    fn test_cell_stats_counts_disputed() {
        let mut map = plains_map(3, 1);
        for x in 0..3 {
            let cell = map.cell_mut(GridPos::new(x, 0));
            cell.owner = Some(CivId(1));
            cell.attributes.tech = 30.0;
        }
        map.cell_mut(GridPos::new(2, 0)).disputed = true;
        let stats = map.cell_stats(CivId(1));
        assert_eq!(stats.total_cells, 3);
        assert_eq!(stats.disputed_cells, 1);
        assert_eq!(stats.terrain_counts.get(&Terrain::Plains), Some(&3));
        assert!((stats.average_attributes.tech - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_power_intensity_is_bounded() {
        let mut map = plains_map(1, 1);
        let cell = map.cell_mut(GridPos::new(0, 0));
        cell.attributes = cell.limits;
        assert!((cell.power_intensity() - 1.0).abs() < 1e-9);
        cell.attributes = Attributes::default();
        assert_eq!(cell.power_intensity(), 0.0);
    }
}
