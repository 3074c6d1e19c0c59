//! Meadow Sim - individual-based solitary bee population simulation

pub mod core;
pub mod environment;
pub mod extensions;
pub mod female;
pub mod individual;
pub mod nest;
pub mod output;
pub mod population;
pub mod stages;
pub mod tables;
