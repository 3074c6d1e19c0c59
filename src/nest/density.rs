//! Coarse female density grid
//!
//! One counter per 1 km2 cell, reset each day and repopulated during the
//! sequential begin-of-day phase; the competition discount reads it during
//! foraging. Writes during parallel seeding are not synchronized; at
//! worst the day-0 competition discount is approximate.

use crate::core::types::Vec2;

#[derive(Debug)]
pub struct DensityGrid {
    cols: usize,
    rows: usize,
    cell_m: f64,
    counts: Vec<u32>,
}

impl DensityGrid {
    pub fn new(width_m: f64, height_m: f64, cell_m: f64) -> Self {
        let cols = (width_m / cell_m).ceil().max(1.0) as usize;
        let rows = (height_m / cell_m).ceil().max(1.0) as usize;
        Self {
            cols,
            rows,
            cell_m,
            counts: vec![0; cols * rows],
        }
    }

    fn index(&self, pos: Vec2) -> Option<usize> {
        if pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let c = (pos.x / self.cell_m) as usize;
        let r = (pos.y / self.cell_m) as usize;
        (c < self.cols && r < self.rows).then(|| r * self.cols + c)
    }

    /// Daily reset; yesterday's distribution is obsolete once females move
    pub fn clear(&mut self) {
        self.counts.fill(0);
    }

    pub fn increment(&mut self, pos: Vec2) {
        if let Some(i) = self.index(pos) {
            self.counts[i] += 1;
        }
    }

    pub fn decrement(&mut self, pos: Vec2) {
        if let Some(i) = self.index(pos) {
            self.counts[i] = self.counts[i].saturating_sub(1);
        }
    }

    /// Females registered in the cell containing `pos`
    pub fn count_at(&self, pos: Vec2) -> u32 {
        self.index(pos).map(|i| self.counts[i]).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_and_count() {
        let mut grid = DensityGrid::new(3000.0, 2000.0, 1000.0);
        let p = Vec2::new(1500.0, 500.0);
        grid.increment(p);
        grid.increment(p);
        assert_eq!(grid.count_at(p), 2);
        // Neighbouring cell unaffected
        assert_eq!(grid.count_at(Vec2::new(2500.0, 500.0)), 0);
    }

    #[test]
    fn test_clear_resets_all() {
        let mut grid = DensityGrid::new(2000.0, 2000.0, 1000.0);
        grid.increment(Vec2::new(100.0, 100.0));
        grid.clear();
        assert_eq!(grid.count_at(Vec2::new(100.0, 100.0)), 0);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut grid = DensityGrid::new(1000.0, 1000.0, 1000.0);
        grid.increment(Vec2::new(-5.0, 10.0));
        grid.increment(Vec2::new(5000.0, 10.0));
        assert_eq!(grid.count_at(Vec2::new(10.0, 10.0)), 0);
        grid.decrement(Vec2::new(-5.0, 10.0));
    }

    #[test]
    fn test_decrement_saturates() {
        let mut grid = DensityGrid::new(1000.0, 1000.0, 1000.0);
        let p = Vec2::new(10.0, 10.0);
        grid.decrement(p);
        assert_eq!(grid.count_at(p), 0);
    }
}
