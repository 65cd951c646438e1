//! Error types for parsing, rewriting, rendering and formatting.

use thiserror::Error;

/// Surface syntax could not be turned into a query tree
#[derive(Debug, Error)]
pub enum ParseError {
    /// Syntax error in the entity language
    #[error("IQL parse error: {message}")]
    Iql { message: String },

    /// Syntax error in the link language
    #[error("KQL parse error: {message}")]
    Kql { message: String },

    /// No registered syntax recognised the input
    #[error("No syntax matched input (tried: {tried:?})")]
    NoMatchingSyntax {
        input: String,
        tried: Vec<&'static str>,
    },
}

fn crit_or_dash(crit: &Option<String>) -> &str {
    crit.as_deref().unwrap_or("-")
}

/// Join predicate inference failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("No relation from '{start}' to '{end}' for '{what}'", what = crit_or_dash(.crit))]
    NotFound {
        start: String,
        end: String,
        crit: Option<String>,
    },

    #[error("{count} relations from '{start}' to '{end}' match '{what}'", what = crit_or_dash(.crit))]
    Ambiguous {
        start: String,
        end: String,
        crit: Option<String>,
        count: usize,
    },

    #[error("Link '{link}' does not connect '{start}' and '{end}'")]
    UnresolvedLink {
        link: String,
        start: String,
        end: String,
    },

    #[error("'{name}' is neither a catalog table nor a block")]
    UnknownTable { name: String },
}

/// A query that parses and resolves but cannot be translated faithfully
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("Outer joined table '{alias}' must not be used in the select filter")]
    OuterJoinFilter { alias: String },

    #[error("Outer joined table '{alias}' must not carry a HAVING clause")]
    OuterJoinHaving { alias: String },

    #[error("Cannot resolve identity of '{alias}': {reason}")]
    UnresolvedIdentity { alias: String, reason: String },
}

impl SemanticError {
    pub fn identity(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedIdentity {
            alias: alias.into(),
            reason: reason.into(),
        }
    }
}

/// A rewrite pass aborted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

/// SQL generation failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The tree breaks an invariant every builder guarantees
    #[error("Malformed query tree: {0}")]
    Structural(String),
}

impl RenderError {
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }
}

/// Surface text generation failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("{language} cannot express {feature}")]
    Unsupported {
        language: &'static str,
        feature: String,
    },

    #[error("No formatter for language '{language}' (known: iql, kql)")]
    UnknownLanguage { language: String },
}

/// Any failure of a full translation
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type TranslateResult<T> = Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_tables_and_crit() {
        let err = ResolveError::NotFound {
            start: "orders".into(),
            end: "customers".into(),
            crit: Some("placed".into()),
        };
        assert_eq!(
            err.to_string(),
            "No relation from 'orders' to 'customers' for 'placed'"
        );
    }

    #[test]
    fn test_missing_crit_renders_dash() {
        let err = ResolveError::Ambiguous {
            start: "a".into(),
            end: "b".into(),
            crit: None,
            count: 2,
        };
        assert_eq!(err.to_string(), "2 relations from 'a' to 'b' match '-'");
    }

    #[test]
    fn test_transform_error_is_transparent() {
        let err: TransformError = SemanticError::OuterJoinFilter { alias: "c".into() }.into();
        assert_eq!(
            err.to_string(),
            "Outer joined table 'c' must not be used in the select filter"
        );
    }
}
