//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Stable handle to an individual stored in the population arena.
///
/// Slot index plus generation counter; a stale handle (generation
/// mismatch after slot reuse) never resolves to the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndividualId {
    pub index: u32,
    pub generation: u32,
}

impl IndividualId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Simulation day counter (one tick per day)
pub type Day = u64;

/// Landscape region (habitat polygon) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionId(pub u32);

/// Unique nest identifier, issued by the nest registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NestId(pub u64);

/// Address of a single brood cell: region (for lock lookup), nest, cell index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub region: RegionId,
    pub nest: NestId,
    pub cell: u32,
}

/// 2D position in landscape metres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 1e-9 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::default()
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

/// Offspring sex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

/// Parasitism status carried through the life cycle.
///
/// A parasitised individual develops normally but dies at emergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parasitism {
    Unparasitised,
    /// Cleptoparasite entered while the cell stood open
    CleptoParasite,
    /// Bombylid fly oviposition
    Bombylid,
}

impl Parasitism {
    pub fn is_parasitised(&self) -> bool {
        !matches!(self, Parasitism::Unparasitised)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_individual_id_generation_distinguishes_reuse() {
        let a = IndividualId::new(3, 0);
        let b = IndividualId::new(3, 1);
        assert_ne!(a, b);
        assert_eq!(a.index, b.index);
    }

    #[test]
    fn test_region_id_hash() {
        use std::collections::HashMap;
        let mut map: HashMap<RegionId, u32> = HashMap::new();
        map.insert(RegionId(7), 42);
        assert_eq!(map.get(&RegionId(7)), Some(&42));
    }

    #[test]
    fn test_vec2_distance() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_vec2_normalize_zero() {
        let z = Vec2::default();
        assert_eq!(z.normalize(), Vec2::default());
    }

    #[test]
    fn test_parasitism_flag() {
        assert!(!Parasitism::Unparasitised.is_parasitised());
        assert!(Parasitism::CleptoParasite.is_parasitised());
        assert!(Parasitism::Bombylid.is_parasitised());
    }
}
