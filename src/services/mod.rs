// src/services/mod.rs

//! Clients for external services.
//!
//! - Remote repository item creation (`DSpaceClient`)
//! - Identifier resolution (`DoiResolver`)

mod doi;
mod dspace;

pub use doi::{DoiResolver, from_csl};
pub use dspace::{DSpaceClient, PASSWORD_ENV, item_payload};
