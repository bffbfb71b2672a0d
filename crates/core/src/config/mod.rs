//! Configuration loading and schema definitions
//!
//! Build defaults read from `.spm-to-xcframework.toml`.

mod loader;
mod schema;

pub use loader::{Config, CONFIG_CANDIDATES};
pub use schema::*;
