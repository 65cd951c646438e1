//! Catalog error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Relation '{relation}' pairs {start} start columns with {end} end columns")]
    ColumnArity {
        relation: String,
        start: usize,
        end: usize,
    },

    #[error("Duplicate table '{0}' in schema")]
    DuplicateTable(String),
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
