//! jobcraft library
//!
//! Layered configuration resolution and the filesystem-backed entity store
//! shared by the analysis, rendering and UI components.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
