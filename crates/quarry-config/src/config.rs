//! Configuration structures

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ConfigError;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relation resolver flags
    pub resolver: ResolverConfig,
    /// SQL generation settings
    pub sql: SqlConfig,
    /// Catalog file locations
    pub catalog: CatalogConfig,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a config file. Relative catalog paths are resolved against the
    /// directory containing the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.catalog = config.catalog.relative_to(base);
        }
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Flags steering relation resolution.
///
/// Passed by value into every lookup, so two translations with different
/// settings never observe each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Never match a relation with start and end swapped
    pub aligned_only: bool,
    /// Never match a relation by its tables alone, ignoring its name
    pub qualified_only: bool,
    /// Treat ambiguous matches and unknown links as errors
    pub strict: bool,
}

/// Target SQL flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// ANSI temporal literals (`DATE '...'`)
    #[default]
    Ansi,
    /// JDBC escape sequences (`{d '...'}`)
    Jdbc,
}

/// How identifiers are written into generated SQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierStyle {
    /// Lowercase, unquoted
    #[default]
    Lowercase,
    /// As written in the query, unquoted
    Preserve,
    /// As written, always double quoted
    Quoted,
}

/// SQL generation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Literal dialect
    pub dialect: SqlDialect,
    /// Identifier case and quoting
    pub identifiers: IdentifierStyle,
    /// Run the rewrite pipeline before generating SQL
    pub rewrite: bool,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::Ansi,
            identifiers: IdentifierStyle::Lowercase,
            rewrite: true,
        }
    }
}

/// Catalog file locations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Schema JSON (tables, columns, relations)
    pub schema: Option<PathBuf>,
    /// Link dictionary JSON
    pub links: Option<PathBuf>,
}

impl CatalogConfig {
    fn relative_to(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        Self {
            schema: self.schema.map(resolve),
            links: self.links.map(resolve),
        }
    }
}
