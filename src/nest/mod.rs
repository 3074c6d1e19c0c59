//! Nests and brood cells
//!
//! A nest is an ordered run of cells in one cavity. Cells hold at most one
//! living occupant; the only occupancy mutations are first occupancy
//! (`add_egg`/`add_cocoon`) and `vacate`. Stage transitions rewrite the
//! occupant in place, so its id and the cell binding both survive.

pub mod density;
pub mod registry;

pub use density::DensityGrid;
pub use registry::NestRegistry;

use crate::core::types::{IndividualId, NestId, RegionId, Vec2};

/// One provisioned compartment. Exactly one occupant across its lifetime.
#[derive(Debug, Clone)]
pub struct Cell {
    occupant: Option<IndividualId>,
    sealed: bool,
}

impl Cell {
    pub fn occupant(&self) -> Option<IndividualId> {
        self.occupant
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

/// A single cavity nest
#[derive(Debug, Clone)]
pub struct Nest {
    pub id: NestId,
    pub region: RegionId,
    pub loc: Vec2,
    /// Open while the owning female is still provisioning cells here
    is_open: bool,
    /// Site-aspect emergence offset in days; shaded cavities warm later
    aspect_delay: i32,
    cells: Vec<Cell>,
}

impl Nest {
    pub fn new(id: NestId, region: RegionId, loc: Vec2, aspect_delay: i32) -> Self {
        Self {
            id,
            region,
            loc,
            is_open: true,
            aspect_delay,
            cells: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Seal the whole nest; called when the owner finishes or abandons it
    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn aspect_delay(&self) -> i32 {
        self.aspect_delay
    }

    pub fn cell(&self, index: u32) -> Option<&Cell> {
        self.cells.get(index as usize)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells still holding a living occupant
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.occupant.is_some()).count()
    }

    /// First occupancy by a fresh egg; the cell is sealed at laying
    pub fn add_egg(&mut self, occupant: IndividualId) -> u32 {
        self.cells.push(Cell {
            occupant: Some(occupant),
            sealed: true,
        });
        (self.cells.len() - 1) as u32
    }

    /// First occupancy by a relocated cocoon (seeding path)
    pub fn add_cocoon(&mut self, occupant: IndividualId) -> u32 {
        self.add_egg(occupant)
    }

    /// Vacate a cell on death or emergence
    pub fn vacate(&mut self, index: u32) {
        if let Some(cell) = self.cells.get_mut(index as usize) {
            cell.occupant = None;
        }
    }

    /// A nest is finished when it is closed and every cell is vacated
    pub fn is_spent(&self) -> bool {
        !self.is_open && self.cells.iter().all(|c| c.occupant.is_none())
    }
}
