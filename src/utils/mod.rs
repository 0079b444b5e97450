// src/utils/mod.rs

//! Utility functions and helpers.

pub mod date;
pub mod html;
pub mod http;
pub mod log;
pub mod url;
