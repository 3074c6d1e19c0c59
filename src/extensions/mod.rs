//! Optional narrow extensions: parasitism and pesticide toxicodynamics

pub mod parasitism;
pub mod pesticide;

pub use parasitism::{ParasitismModel, ParasitoidDensity};
pub use pesticide::PesticideBurden;
