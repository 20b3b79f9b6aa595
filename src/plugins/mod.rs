//! Tutoring subsystems.

pub mod explain;
pub mod graph;
pub mod orchestrator;
pub mod policy;
pub mod questions;
pub mod scoring;
pub mod state;
pub mod templating;
