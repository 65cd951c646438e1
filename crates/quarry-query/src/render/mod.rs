//! SQL generation.
//!
//! [`SqlGenerator`] renders a rewritten [`Query`] as SQL text. The temporal
//! literal spelling is the only thing that differs between targets and is
//! supplied by a [`Dialect`].

pub mod literal;
mod sql;

pub use sql::SqlGenerator;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::ast::Query;
use crate::error::RenderError;

/// Trait for rendering a query tree to a target query language.
pub trait QueryRenderer: Send + Sync {
    /// Unique name for this renderer
    fn name(&self) -> &str;

    /// Render the query to text
    fn render(&self, query: &Query) -> Result<String, RenderError>;
}

/// Spelling of temporal literals.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn date(&self, value: NaiveDate) -> String {
        format!("DATE '{}'", literal::date(value))
    }

    fn timestamp(&self, value: NaiveDateTime) -> String {
        format!("TIMESTAMP '{}'", literal::timestamp(value))
    }

    fn time(&self, value: NaiveTime) -> String {
        format!("TIME '{}'", literal::time(value))
    }
}

/// ANSI SQL typed literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn name(&self) -> &'static str {
        "ansi"
    }
}

/// JDBC escape sequences: `{d '...'}`, `{ts '...'}`, `{t '...'}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JdbcDialect;

impl Dialect for JdbcDialect {
    fn name(&self) -> &'static str {
        "jdbc"
    }

    fn date(&self, value: NaiveDate) -> String {
        format!("{{d '{}'}}", literal::date(value))
    }

    fn timestamp(&self, value: NaiveDateTime) -> String {
        format!("{{ts '{}'}}", literal::timestamp(value))
    }

    fn time(&self, value: NaiveTime) -> String {
        format!("{{t '{}'}}", literal::time(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    #[test]
    fn test_ansi_literals() {
        let dialect = AnsiDialect;
        assert_eq!(dialect.date(day()), "DATE '2024-01-31'");
        assert_eq!(
            dialect.timestamp(day().and_hms_opt(10, 0, 0).unwrap()),
            "TIMESTAMP '2024-01-31 10:00:00'"
        );
        assert_eq!(
            dialect.time(NaiveTime::from_hms_opt(23, 59, 1).unwrap()),
            "TIME '23:59:01'"
        );
    }

    #[test]
    fn test_jdbc_escapes() {
        let dialect = JdbcDialect;
        assert_eq!(dialect.date(day()), "{d '2024-01-31'}");
        assert_eq!(
            dialect.timestamp(day().and_hms_opt(10, 0, 0).unwrap()),
            "{ts '2024-01-31 10:00:00'}"
        );
        assert_eq!(
            dialect.time(NaiveTime::from_hms_opt(8, 0, 0).unwrap()),
            "{t '08:00:00'}"
        );
    }
}
