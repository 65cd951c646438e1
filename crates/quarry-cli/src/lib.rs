//! Quarry CLI library
//!
//! Argument definitions and command implementations for the `quarry`
//! binary. Commands read a query from a file (or stdin for `-`) and write
//! their result to stdout; logging goes to stderr.

pub mod cli;
pub mod commands;
pub mod input;
