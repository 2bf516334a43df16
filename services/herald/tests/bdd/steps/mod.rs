//! BDD step definitions for herald service

pub mod aggregation_steps;
pub mod polling_steps;
pub mod settings_steps;
