//! Command implementations.

pub mod ast;
pub mod check;
pub mod format;
pub mod sql;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use quarry_catalog::Catalog;
use quarry_config::Config;
use quarry_query::Translator;

use crate::cli::{Cli, Commands};

/// Settings shared by every command: the loaded config with CLI overrides
/// applied.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub config: Config,
}

impl Session {
    /// Load the config file (if any) and apply `--schema` / `--links`.
    pub fn load(config: Option<PathBuf>, schema: Option<PathBuf>, links: Option<PathBuf>) -> Result<Self> {
        let mut config = match config {
            Some(path) => Config::load(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        if schema.is_some() {
            config.catalog.schema = schema;
        }
        if links.is_some() {
            config.catalog.links = links;
        }
        Ok(Self { config })
    }

    /// Load the catalog named by the config.
    pub fn catalog(&self) -> Result<Catalog> {
        let schema = self
            .config
            .catalog
            .schema
            .as_ref()
            .context("No schema given; pass --schema or set [catalog] schema in the config")?;
        debug!(schema = %schema.display(), "loading catalog");
        Catalog::load(schema, self.config.catalog.links.as_deref())
            .with_context(|| format!("Failed to load catalog {}", schema.display()))
    }

    pub fn translator(&self) -> Result<Translator> {
        Ok(Translator::new(Arc::new(self.catalog()?), self.config.clone()))
    }
}

/// Run the parsed command line.
pub fn execute(cli: Cli) -> Result<()> {
    let session = Session::load(cli.config, cli.schema, cli.links)?;
    match cli.command {
        Commands::Sql {
            file,
            jdbc,
            raw,
            syntax,
        } => sql::execute(session, &file, jdbc, raw, syntax.as_deref()),
        Commands::Format { file, to } => format::execute(&file, to),
        Commands::Ast { file } => ast::execute(&file),
        Commands::Check { file } => check::execute(&session, &file),
    }
}
