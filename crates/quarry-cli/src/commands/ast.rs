use anyhow::{Context, Result};
use std::path::Path;

use quarry_query::QuerySyntaxRegistry;

use crate::input::read_query;

/// Print the parsed, unrewritten query tree as pretty JSON.
pub fn execute(file: &Path) -> Result<()> {
    let text = read_query(file)?;
    let query = QuerySyntaxRegistry::standard().parse(&text)?;
    let json = serde_json::to_string_pretty(&query).context("Failed to serialize query tree")?;
    println!("{json}");
    Ok(())
}
