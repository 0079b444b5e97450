// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains the data structures shared across the pipeline,
//! organized by their primary purpose.

mod collection;
mod config;
mod keywords;
mod record;

// Re-export all public types
pub use collection::ResultCollection;
pub use config::{
    CANONICAL_FIELDS, Config, FieldMapping, HarvestConfig, HttpConfig, RemoteConfig, SourceConfig,
    SourceKind,
};
pub use keywords::KeywordBatch;
pub use record::{Record, RecordBuilder, UNKNOWN_DATATYPE};
