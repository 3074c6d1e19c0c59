//! Individual representation: a tagged record over the six life stages
//!
//! One `Individual` exists per live agent; a stage transition rewrites the
//! `stage` payload in place (construct-and-replace on the tag) so the
//! arena slot, id and cell occupancy all survive the transition.

pub mod arena;

pub use arena::Arena;

use serde::{Deserialize, Serialize};

use crate::core::types::{CellKey, NestId, Parasitism, RegionId, Sex, Vec2};
use crate::female::FemaleState;
use crate::stages::development::{DegreeDayClock, PrepupalClock};
use crate::stages::overwinter::OverwinterState;

/// Life stage discriminant, ordered by development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageTag {
    Egg,
    Larva,
    Prepupa,
    Pupa,
    InCocoon,
    Female,
}

impl StageTag {
    pub const ALL: [StageTag; 6] = [
        StageTag::Egg,
        StageTag::Larva,
        StageTag::Prepupa,
        StageTag::Pupa,
        StageTag::InCocoon,
        StageTag::Female,
    ];

    pub fn index(&self) -> usize {
        match self {
            StageTag::Egg => 0,
            StageTag::Larva => 1,
            StageTag::Prepupa => 2,
            StageTag::Pupa => 3,
            StageTag::InCocoon => 4,
            StageTag::Female => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StageTag::Egg => "Egg",
            StageTag::Larva => "Larva",
            StageTag::Prepupa => "Prepupa",
            StageTag::Pupa => "Pupa",
            StageTag::InCocoon => "In Cocoon",
            StageTag::Female => "Female",
        }
    }

    /// Successor stage in the development chain, None after Female
    pub fn next(&self) -> Option<StageTag> {
        match self {
            StageTag::Egg => Some(StageTag::Larva),
            StageTag::Larva => Some(StageTag::Prepupa),
            StageTag::Prepupa => Some(StageTag::Pupa),
            StageTag::Pupa => Some(StageTag::InCocoon),
            StageTag::InCocoon => Some(StageTag::Female),
            StageTag::Female => None,
        }
    }
}

/// Stage-specific development/behaviour payload
#[derive(Debug, Clone)]
pub enum StageState {
    Egg(DegreeDayClock),
    Larva(DegreeDayClock),
    Prepupa(PrepupalClock),
    Pupa(DegreeDayClock),
    InCocoon(OverwinterState),
    Female(FemaleState),
}

impl StageState {
    pub fn tag(&self) -> StageTag {
        match self {
            StageState::Egg(_) => StageTag::Egg,
            StageState::Larva(_) => StageTag::Larva,
            StageState::Prepupa(_) => StageTag::Prepupa,
            StageState::Pupa(_) => StageTag::Pupa,
            StageState::InCocoon(_) => StageTag::InCocoon,
            StageState::Female(_) => StageTag::Female,
        }
    }
}

/// One live agent. Shared envelope plus the stage payload.
#[derive(Debug, Clone)]
pub struct Individual {
    pub pos: Vec2,
    pub region: RegionId,
    /// Days since entering the current stage (reset at transition;
    /// at emergence it becomes adult age)
    pub age_days: u32,
    /// Provision mass (mg) for immature stages, body mass for females
    pub mass_mg: f64,
    pub sex: Sex,
    pub parasitism: Parasitism,
    pub nest: Option<NestId>,
    pub cell: Option<CellKey>,
    /// Daily double-step guard: last day this individual advanced
    pub stepped_on: Option<u64>,
    pub stage: StageState,
}

impl Individual {
    pub fn tag(&self) -> StageTag {
        self.stage.tag()
    }
}

/// Why an individual left the population. Expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Lost a daily mortality trial
    DailyMortality,
    /// Lost the one-time winter mortality trial at counter exhaustion
    WinterMortality,
    /// Emergence counter never exhausted by the June deadline
    EmergenceDeadline,
    /// Parasite consumed the occupant; surfaces at emergence
    Parasitised,
    /// Males leave the simulation at emergence
    MaleEmergence,
    /// Pesticide body burden mortality
    Pesticide,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_chain_order() {
        let mut tag = StageTag::Egg;
        let mut seen = vec![tag];
        while let Some(next) = tag.next() {
            seen.push(next);
            tag = next;
        }
        assert_eq!(seen, StageTag::ALL.to_vec());
    }

    #[test]
    fn test_stage_indices_are_dense() {
        for (i, tag) in StageTag::ALL.iter().enumerate() {
            assert_eq!(tag.index(), i);
        }
    }
}
