//! # Quarry Configuration
//!
//! Settings shared by the translator and the CLI: relation resolver flags,
//! SQL dialect and identifier style, and where the catalog lives.
//!
//! Every section has safe defaults, so an empty file (or no file at all) is
//! a valid configuration.
//!
//! ```toml
//! [resolver]
//! strict = true
//!
//! [sql]
//! dialect = "jdbc"
//! identifiers = "preserve"
//!
//! [catalog]
//! schema = "schema.json"
//! links = "links.json"
//! ```

#![warn(missing_docs)]

mod config;
mod error;

pub use config::*;
pub use error::*;
