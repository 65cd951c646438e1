//! One-stop translation: surface text in, SQL out.

use std::sync::Arc;

use quarry_catalog::Catalog;
use quarry_config::{Config, SqlDialect};
use tracing::{debug, info};

use crate::ast::Query;
use crate::error::{FormatError, ParseError, TranslateResult};
use crate::format::formatter;
use crate::render::SqlGenerator;
use crate::resolver::RelationResolver;
use crate::syntax::QuerySyntaxRegistry;
use crate::transform::TransformPipeline;

/// Parses, rewrites and renders queries against one catalog.
///
/// Every call reads the translator's own [`Config`]; two translators with
/// different settings can be used side by side.
pub struct Translator {
    catalog: Arc<Catalog>,
    config: Config,
    syntaxes: QuerySyntaxRegistry,
}

impl Translator {
    pub fn new(catalog: Arc<Catalog>, config: Config) -> Self {
        Self {
            catalog,
            config,
            syntaxes: QuerySyntaxRegistry::standard(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse with whichever syntax recognises the input.
    pub fn parse(&self, input: &str) -> TranslateResult<Query> {
        Ok(self.syntaxes.parse(input)?)
    }

    /// Parse with a named syntax, skipping detection.
    pub fn parse_as(&self, syntax: &str, input: &str) -> TranslateResult<Query> {
        let parser = self
            .syntaxes
            .get(syntax)
            .ok_or_else(|| ParseError::NoMatchingSyntax {
                input: input.to_string(),
                tried: self.syntaxes.syntax_names(),
            })?;
        Ok(parser.parse(input)?)
    }

    /// Run the rewrite passes.
    pub fn rewrite(&self, query: Query) -> TranslateResult<Query> {
        let pipeline = TransformPipeline::standard(self.resolver(), self.config.resolver);
        Ok(pipeline.apply(query)?)
    }

    /// Render SQL in the configured dialect and identifier style.
    pub fn to_sql(&self, query: &Query) -> TranslateResult<String> {
        let sql = match self.config.sql.dialect {
            SqlDialect::Ansi => self.generator(SqlGenerator::ansi(self.resolver())).to_sql(query)?,
            SqlDialect::Jdbc => self.generator(SqlGenerator::jdbc(self.resolver())).to_sql(query)?,
        };
        Ok(sql)
    }

    /// Parse, rewrite (unless disabled in the config) and render.
    pub fn translate(&self, input: &str) -> TranslateResult<String> {
        let query = self.parse(input)?;
        let query = if self.config.sql.rewrite {
            self.rewrite(query)?
        } else {
            debug!("rewrite disabled, rendering parsed tree");
            query
        };
        let sql = self.to_sql(&query)?;
        info!(bytes = sql.len(), "translated query");
        Ok(sql)
    }

    /// Write a query tree in `language` (`iql` or `kql`).
    pub fn format(&self, query: &Query, language: &str) -> TranslateResult<String> {
        let formatter = formatter(language).ok_or_else(|| FormatError::UnknownLanguage {
            language: language.to_string(),
        })?;
        Ok(formatter.format(query)?)
    }

    fn resolver(&self) -> RelationResolver {
        RelationResolver::new(Arc::clone(&self.catalog))
    }

    fn generator<D: crate::render::Dialect>(&self, generator: SqlGenerator<D>) -> SqlGenerator<D> {
        generator
            .with_resolver_config(self.config.resolver)
            .with_identifiers(self.config.sql.identifiers)
    }
}
