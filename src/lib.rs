// src/lib.rs

//! Harvester Library
//!
//! Queries scholarly repositories by keyword, normalizes what they return
//! into uniform records, drops records whose persistent identifier was seen
//! in an earlier run and exports the rest.

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod sources;
pub mod storage;
pub mod utils;
