//! Generational slot arena for individuals
//!
//! Stable indices with a free list; slot reuse bumps the generation so
//! stale ids never resolve. `take`/`restore` lends an individual out of
//! the arena while keeping its slot reserved, which lets behaviour code
//! hold `&mut Individual` while creating offspring through the arena.

use crate::core::types::IndividualId;
use crate::individual::Individual;

#[derive(Debug)]
struct Slot {
    generation: u32,
    occupant: Option<Individual>,
    /// Lent out via `take`; the slot is not free but has no occupant
    reserved: bool,
}

/// Slot arena with free-list reuse
#[derive(Debug, Default)]
pub struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn insert(&mut self, individual: Individual) -> IndividualId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.occupant = Some(individual);
            IndividualId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                occupant: Some(individual),
                reserved: false,
            });
            IndividualId::new(index, 0)
        }
    }

    pub fn get(&self, id: IndividualId) -> Option<&Individual> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.occupant.as_ref())
    }

    pub fn get_mut(&mut self, id: IndividualId) -> Option<&mut Individual> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.occupant.as_mut())
    }

    /// Remove and return; the slot joins the free list with a bumped
    /// generation so the old id goes stale
    pub fn remove(&mut self, id: IndividualId) -> Option<Individual> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.occupant.is_none() {
            return None;
        }
        let individual = slot.occupant.take();
        slot.generation = slot.generation.wrapping_add(1);
        slot.reserved = false;
        self.free.push(id.index);
        self.live -= 1;
        individual
    }

    /// Lend the individual out; the slot stays reserved (not reusable)
    /// until `restore` or `discard_reserved`
    pub fn take(&mut self, id: IndividualId) -> Option<Individual> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.occupant.is_none() {
            return None;
        }
        slot.reserved = true;
        slot.occupant.take()
    }

    /// Return a lent individual to its reserved slot
    pub fn restore(&mut self, id: IndividualId, individual: Individual) {
        let slot = &mut self.slots[id.index as usize];
        debug_assert!(slot.reserved && slot.generation == id.generation);
        slot.occupant = Some(individual);
        slot.reserved = false;
    }

    /// Drop a lent individual instead of restoring it
    pub fn discard_reserved(&mut self, id: IndividualId) {
        let slot = &mut self.slots[id.index as usize];
        debug_assert!(slot.reserved && slot.generation == id.generation);
        slot.generation = slot.generation.wrapping_add(1);
        slot.reserved = false;
        self.free.push(id.index);
        self.live -= 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndividualId, &Individual)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.occupant
                .as_ref()
                .map(|ind| (IndividualId::new(i as u32, slot.generation), ind))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (IndividualId, &mut Individual)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            slot.occupant
                .as_mut()
                .map(|ind| (IndividualId::new(i as u32, slot.generation), ind))
        })
    }

    /// Ids of all live individuals; snapshot for iteration that mutates
    /// the arena as it goes
    pub fn ids(&self) -> Vec<IndividualId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Parallel access to raw entries: (index, generation, occupant)
    pub(crate) fn entries_mut(&mut self) -> impl rayon::prelude::ParallelIterator<Item = (IndividualId, &mut Individual)> {
        use rayon::prelude::*;
        self.slots.par_iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.occupant
                .as_mut()
                .map(move |ind| (IndividualId::new(i as u32, generation), ind))
        })
    }
}
