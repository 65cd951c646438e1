use anyhow::Result;
use std::path::Path;
use tracing::debug;

use quarry_config::SqlDialect;

use super::Session;
use crate::input::read_query;

/// Translate a query file to SQL and print it.
pub fn execute(
    mut session: Session,
    file: &Path,
    jdbc: bool,
    raw: bool,
    syntax: Option<&str>,
) -> Result<()> {
    if jdbc {
        session.config.sql.dialect = SqlDialect::Jdbc;
    }
    if raw {
        session.config.sql.rewrite = false;
    }
    let translator = session.translator()?;
    let text = read_query(file)?;

    let sql = match syntax {
        None => translator.translate(&text)?,
        Some(name) => {
            debug!(syntax = name, "parsing with explicit syntax");
            let query = translator.parse_as(name, &text)?;
            let query = if raw { query } else { translator.rewrite(query)? };
            translator.to_sql(&query)?
        }
    };
    println!("{sql}");
    Ok(())
}
