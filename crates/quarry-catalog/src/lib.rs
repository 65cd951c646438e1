//! # Quarry Catalog
//!
//! Read-only description of the relational database a query is translated
//! against: tables with their primary key columns, foreign-key relations
//! between tables, and the symbolic link names that map onto relations.
//!
//! The catalog is loaded once (usually from JSON) and then shared behind an
//! `Arc` by every translation.

mod catalog;
mod error;
mod model;

pub mod ident;

pub use catalog::{Catalog, Links};
pub use error::{CatalogError, CatalogResult};
pub use model::{Column, Relation, Schema, Table};
