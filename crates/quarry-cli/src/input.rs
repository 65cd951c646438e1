//! Query text from files or stdin.

use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Read a query. `-` reads all of stdin.
pub fn read_query(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read query from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read query {}", path.display()))
}
