// src/pipeline/mod.rs

//! Harvest pipeline.
//!
//! - `harvest`: keyword batch orchestration (`QueryPipeline`)
//! - `normalize`: raw results to canonical records
//! - `pacing`: cooldown policies between remote calls

pub mod harvest;
pub mod normalize;
pub mod pacing;

pub use harvest::{QueryPipeline, RunOutcome, RunReport, RunStats, Stage};
pub use normalize::Normalizer;
pub use pacing::{FixedCooldown, NoPacing, PacingPolicy};
