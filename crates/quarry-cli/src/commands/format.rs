use anyhow::Result;
use std::path::Path;

use quarry_query::format::formatter;
use quarry_query::{FormatError, QuerySyntaxRegistry};

use crate::cli::Language;
use crate::input::read_query;

/// Parse a query in either language and print it in `to`.
pub fn execute(file: &Path, to: Language) -> Result<()> {
    let text = read_query(file)?;
    let query = QuerySyntaxRegistry::standard().parse(&text)?;
    let formatter = formatter(to.name()).ok_or_else(|| FormatError::UnknownLanguage {
        language: to.name().to_string(),
    })?;
    println!("{}", formatter.format(&query)?);
    Ok(())
}
