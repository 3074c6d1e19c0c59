//! Stage state machines
//!
//! One step function per immature life stage, evaluated once per day by
//! the population coordinator. Outcomes are values (`StepVerdict`), never
//! errors: stochastic death and developmental stall are expected paths.

pub mod development;
pub mod immature;
pub mod overwinter;

use crate::individual::{RemovalReason, StageTag};

/// Outcome of one daily evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepVerdict {
    /// Re-evaluate unchanged tomorrow
    Continue,
    /// Development complete: replace the stage payload with the successor
    Transition(StageTag),
    /// Leave the population (death or male emergence)
    Remove(RemovalReason),
}
