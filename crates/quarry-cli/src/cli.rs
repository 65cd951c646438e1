use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (default for verbose)
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Surface languages accepted by `format --to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Language {
    /// Entity language (`SELECT ... OWNER`)
    Iql,
    /// Link language (`FIND a, a-crit->b`)
    Kql,
}

impl Language {
    pub fn name(self) -> &'static str {
        match self {
            Language::Iql => "iql",
            Language::Kql => "kql",
        }
    }
}

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "quarry - translate entity and link queries to SQL")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short = 'C', long, global = true, env = "QUARRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Schema JSON (overrides config file)
    #[arg(short = 's', long, global = true)]
    pub schema: Option<PathBuf>,

    /// Link dictionary JSON (overrides config file)
    #[arg(long, global = true)]
    pub links: Option<PathBuf>,
}

impl Cli {
    /// Effective log level: `--verbose` wins, then `--log-level`, then warn.
    pub fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::DEBUG
        } else {
            self.log_level.map(Into::into).unwrap_or(LevelFilter::WARN)
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a query to SQL
    Sql {
        /// Query file, `-` for stdin
        file: PathBuf,

        /// Use JDBC escape sequences for temporal literals
        #[arg(long)]
        jdbc: bool,

        /// Skip the rewrite passes and render the parsed tree as is
        #[arg(long)]
        raw: bool,

        /// Parse with this syntax instead of detecting it (iql, kql)
        #[arg(long)]
        syntax: Option<String>,
    },

    /// Rewrite a query in one of the surface languages
    Format {
        /// Query file, `-` for stdin
        file: PathBuf,

        /// Target language
        #[arg(long, value_enum, default_value = "iql")]
        to: Language,
    },

    /// Print the parsed query tree as JSON
    Ast {
        /// Query file, `-` for stdin
        file: PathBuf,
    },

    /// Parse, rewrite and render a query, reporting only success or the error
    Check {
        /// Query file, `-` for stdin
        file: PathBuf,
    },
}
