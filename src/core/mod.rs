pub mod calendar;
pub mod config;
pub mod error;
pub mod types;

pub use calendar::SimCalendar;
pub use config::SimulationParams;
pub use error::{Result, SimError};
