//! BDD step definitions for hero-board service

pub mod dashboard_steps;
pub mod lifecycle_steps;
