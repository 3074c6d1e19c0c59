//! Per-region nest-capacity registry
//!
//! Capacity check and count mutation are atomic together: each region's
//! record sits behind its own mutex, held only for the duration of
//! create/release/housekeeping. Independent regions never contend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use ahash::AHashMap;
use rand::Rng;
use tracing::debug;

use crate::core::types::{CellKey, IndividualId, NestId, RegionId, Vec2};
use crate::nest::Nest;

/// Capacity bookkeeping for one landscape region
#[derive(Debug, Default)]
pub struct PolygonNestingRecord {
    capacity: u32,
    nests: AHashMap<NestId, Nest>,
}

impl PolygonNestingRecord {
    pub fn active_count(&self) -> usize {
        self.nests.len()
    }
}

/// Registry of all regions' nesting records
pub struct NestRegistry {
    regions: Vec<Mutex<PolygonNestingRecord>>,
    next_nest_id: AtomicU64,
}

impl NestRegistry {
    /// Build from per-region capacities (habitat-suitability input)
    pub fn new(capacities: Vec<u32>) -> Self {
        let regions = capacities
            .into_iter()
            .map(|capacity| {
                Mutex::new(PolygonNestingRecord {
                    capacity,
                    nests: AHashMap::new(),
                })
            })
            .collect();
        Self {
            regions,
            next_nest_id: AtomicU64::new(0),
        }
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Claim a cavity. Returns None when the region is at capacity or
    /// unsuitable; the caller retries elsewhere or disperses. Never fails
    /// any other way.
    pub fn create_nest(&self, loc: Vec2, region: RegionId, rng: &mut impl Rng) -> Option<NestId> {
        let mut record = self.regions[region.0 as usize].lock().expect("region lock");
        if record.nests.len() >= record.capacity as usize {
            return None;
        }
        let id = NestId(self.next_nest_id.fetch_add(1, Ordering::Relaxed));
        // Site aspect: 0-3 day emergence offset fixed at creation
        let aspect_delay = rng.gen_range(0..4);
        record
            .nests
            .insert(id, Nest::new(id, region, loc, aspect_delay));
        Some(id)
    }

    /// Release a nest outright (abandonment before completion)
    pub fn release_nest(&self, region: RegionId, nest: NestId) {
        let mut record = self.regions[region.0 as usize].lock().expect("region lock");
        record.nests.remove(&nest);
    }

    /// Run a closure against one nest under its region lock
    pub fn with_nest<R>(
        &self,
        region: RegionId,
        nest: NestId,
        f: impl FnOnce(&mut Nest) -> R,
    ) -> Option<R> {
        let mut record = self.regions[region.0 as usize].lock().expect("region lock");
        record.nests.get_mut(&nest).map(f)
    }

    /// First occupancy of a new cell by an egg
    pub fn add_egg(&self, region: RegionId, nest: NestId, occupant: IndividualId) -> Option<CellKey> {
        self.with_nest(region, nest, |n| n.add_egg(occupant))
            .map(|cell| CellKey { region, nest, cell })
    }

    /// Vacate a cell on death or emergence
    pub fn vacate(&self, key: CellKey) {
        self.with_nest(key.region, key.nest, |n| n.vacate(key.cell));
    }

    pub fn cell_sealed(&self, key: CellKey) -> bool {
        self.with_nest(key.region, key.nest, |n| {
            n.cell(key.cell).map(|c| c.is_sealed()).unwrap_or(false)
        })
        .unwrap_or(false)
    }

    pub fn aspect_delay(&self, region: RegionId, nest: NestId) -> i32 {
        self.with_nest(region, nest, |n| n.aspect_delay()).unwrap_or(0)
    }

    pub fn active_count(&self, region: RegionId) -> usize {
        self.regions[region.0 as usize]
            .lock()
            .expect("region lock")
            .active_count()
    }

    pub fn capacity(&self, region: RegionId) -> u32 {
        self.regions[region.0 as usize]
            .lock()
            .expect("region lock")
            .capacity
    }

    /// Total nests across all regions
    pub fn total_active(&self) -> usize {
        self.regions
            .iter()
            .map(|r| r.lock().expect("region lock").active_count())
            .sum()
    }

    /// Daily housekeeping: drop spent nests (closed, fully vacated)
    pub fn housekeeping(&self) {
        let mut dropped = 0usize;
        for record in &self.regions {
            let mut record = record.lock().expect("region lock");
            let before = record.nests.len();
            record.nests.retain(|_, n| !n.is_spent());
            dropped += before - record.nests.len();
        }
        if dropped > 0 {
            debug!(dropped, "removed spent nests");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0)
    }

    #[test]
    fn test_create_respects_capacity() {
        let registry = NestRegistry::new(vec![2]);
        let mut rng = rng();
        let region = RegionId(0);
        assert!(registry.create_nest(Vec2::default(), region, &mut rng).is_some());
        assert!(registry.create_nest(Vec2::default(), region, &mut rng).is_some());
        // Third claim fails rather than exceeding capacity
        assert!(registry.create_nest(Vec2::default(), region, &mut rng).is_none());
        assert_eq!(registry.active_count(region), 2);
    }

    #[test]
    fn test_zero_capacity_region_rejects() {
        let registry = NestRegistry::new(vec![0]);
        let mut rng = rng();
        assert!(registry
            .create_nest(Vec2::default(), RegionId(0), &mut rng)
            .is_none());
    }

    #[test]
    fn test_release_frees_capacity() {
        let registry = NestRegistry::new(vec![1]);
        let mut rng = rng();
        let region = RegionId(0);
        let nest = registry.create_nest(Vec2::default(), region, &mut rng).unwrap();
        assert!(registry.create_nest(Vec2::default(), region, &mut rng).is_none());
        registry.release_nest(region, nest);
        assert!(registry.create_nest(Vec2::default(), region, &mut rng).is_some());
    }

    #[test]
    fn test_housekeeping_drops_spent_nests() {
        let registry = NestRegistry::new(vec![4]);
        let mut rng = rng();
        let region = RegionId(0);
        let nest = registry.create_nest(Vec2::default(), region, &mut rng).unwrap();
        let occupant = IndividualId::new(0, 0);
        let key = registry.add_egg(region, nest, occupant).unwrap();
        registry.housekeeping();
        assert_eq!(registry.active_count(region), 1, "occupied nest survives");

        registry.with_nest(region, nest, |n| n.close());
        registry.vacate(key);
        registry.housekeeping();
        assert_eq!(registry.active_count(region), 0);
    }

    #[test]
    fn test_nest_ids_are_unique_across_regions() {
        let registry = NestRegistry::new(vec![1, 1]);
        let mut rng = rng();
        let a = registry.create_nest(Vec2::default(), RegionId(0), &mut rng).unwrap();
        let b = registry.create_nest(Vec2::default(), RegionId(1), &mut rng).unwrap();
        assert_ne!(a, b);
    }
}
