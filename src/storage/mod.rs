// src/storage/mod.rs

//! Durable state kept between runs.
//!
//! ## Directory Structure
//!
//! ```text
//! {data_dir}/
//! ├── config.toml           # Harvester configuration
//! ├── keys.csv              # Keyword list
//! ├── doi_cache.txt         # Identifier cache snapshot
//! └── data_dump/            # Tabular exports and checkpoints
//!     └── {tag}_{kind}_{keyword}_{DD-MM-YYYY}.csv
//! ```

mod identifiers;

pub use identifiers::{IdentifierCache, PersistGuard, is_doi, normalize_identifier};
