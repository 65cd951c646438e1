//! # Quarry Query
//!
//! Translates queries written in two surface languages into SQL:
//!
//! - the entity language (IQL): `SELECT orders o JOIN placed customers c OWNER`
//! - the link language (KQL): `FIND orders o, o-placed->customers c`
//!
//! Both parse into one query tree ([`ast`]). A fixed sequence of rewrite
//! passes ([`transform`]) resolves block joins, derives grouping, resolves
//! identity references and moves filters to the tables they belong to.
//! [`render::SqlGenerator`] then writes SQL, inferring every join predicate
//! from the catalog's relations.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quarry_catalog::Catalog;
//! use quarry_config::Config;
//! use quarry_query::Translator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::load("schema.json", None)?;
//! let translator = Translator::new(Arc::new(catalog), Config::default());
//! let sql = translator.translate("FIND orders o, o-placed->customers c RETURN o.id")?;
//! println!("{sql}");
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod error;
pub mod format;
pub mod functions;
pub mod normalize;
pub mod render;
pub mod resolver;
pub mod syntax;
pub mod transform;
pub mod walker;

mod translator;

pub use ast::Query;
pub use error::{
    FormatError, ParseError, RenderError, ResolveError, SemanticError, TransformError,
    TranslateError, TranslateResult,
};
pub use format::{IqlFormatter, KqlFormatter, QueryFormatter};
pub use render::{QueryRenderer, SqlGenerator};
pub use resolver::RelationResolver;
pub use syntax::{IqlSyntax, KqlSyntax, QuerySyntax, QuerySyntaxRegistry};
pub use transform::TransformPipeline;
pub use translator::Translator;
