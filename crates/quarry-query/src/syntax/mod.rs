//! Surface syntax parsers.
//!
//! Both languages parse into the same [`Query`] tree, so everything after
//! parsing is language-agnostic. The registry picks a language by its
//! leading keyword: `FIND` for the link language, `SELECT` or `WITH` for
//! the entity language.

pub(crate) mod common;
mod iql;
mod kql;

pub use iql::IqlSyntax;
pub use kql::KqlSyntax;

use crate::ast::Query;
use crate::error::ParseError;
use std::sync::Arc;

/// A surface language that can turn query text into a [`Query`].
pub trait QuerySyntax: Send + Sync {
    /// Lowercase language name (`iql`, `kql`)
    fn name(&self) -> &'static str;

    /// Cheap sniff of the leading keyword. A syntax that answers `true`
    /// owns the input; its parse error is final.
    fn can_handle(&self, input: &str) -> bool;

    fn parse(&self, input: &str) -> Result<Query, ParseError>;

    /// Syntaxes are consulted from the highest priority down. Default: 50
    fn priority(&self) -> u8 {
        50
    }
}

/// Ordered set of syntaxes; dispatches each input to the first one that
/// claims it.
#[derive(Default, Clone)]
pub struct QuerySyntaxRegistry {
    syntaxes: Vec<Arc<dyn QuerySyntax>>,
}

impl QuerySyntaxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The link and entity languages.
    pub fn standard() -> Self {
        Self::new().with(KqlSyntax).with(IqlSyntax)
    }

    /// Chainable [`register`](Self::register).
    pub fn with(mut self, syntax: impl QuerySyntax + 'static) -> Self {
        self.register(Arc::new(syntax));
        self
    }

    /// Add a syntax, keeping the list ordered by descending priority.
    /// Equal priorities keep registration order.
    pub fn register(&mut self, syntax: Arc<dyn QuerySyntax>) {
        let at = self
            .syntaxes
            .iter()
            .position(|s| s.priority() < syntax.priority())
            .unwrap_or(self.syntaxes.len());
        self.syntaxes.insert(at, syntax);
    }

    pub fn parse(&self, input: &str) -> Result<Query, ParseError> {
        let Some(syntax) = self.syntaxes.iter().find(|s| s.can_handle(input)) else {
            return Err(ParseError::NoMatchingSyntax {
                input: input.to_string(),
                tried: self.syntax_names(),
            });
        };
        tracing::debug!(syntax = syntax.name(), "parsing query");
        syntax.parse(input)
    }

    /// Look up a syntax by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&dyn QuerySyntax> {
        self.syntaxes
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
            .map(|s| s.as_ref())
    }

    /// Names in dispatch order
    pub fn syntax_names(&self) -> Vec<&'static str> {
        self.syntaxes.iter().map(|s| s.name()).collect()
    }
}
