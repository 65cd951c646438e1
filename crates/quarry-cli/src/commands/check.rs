use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use super::Session;
use crate::input::read_query;

/// Run the whole translation and report the outcome without printing SQL.
pub fn execute(session: &Session, file: &Path) -> Result<()> {
    let translator = session.translator()?;
    let text = read_query(file)?;
    translator.translate(&text)?;
    println!("{} {}", "OK:".green().bold(), file.display());
    Ok(())
}
