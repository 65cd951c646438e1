//! Schema-driven join predicate inference
//!
//! Given the two tables of a join edge and the edge's criterion (a relation
//! name, a link name or nothing), find the catalog relation that defines the
//! join columns. Candidates are searched in four tiers and the first tier
//! producing exactly one relation wins:
//!
//! 1. typed aligned: name matches, tables in declared order
//! 2. typed reversed: name matches, tables swapped, relation symmetric
//! 3. untyped aligned: tables in declared order, name ignored
//! 4. untyped reversed: tables swapped, relation symmetric, name ignored

use std::sync::Arc;

use quarry_catalog::{ident, Catalog, Relation};
use tracing::{trace, warn};

use crate::error::ResolveError;

pub use quarry_config::ResolverConfig;

/// A relation matched for a concrete `(start, end)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRelation<'a> {
    pub relation: &'a Relation,
    /// The relation was declared from `end` to `start`.
    pub reversed: bool,
}

impl<'a> ResolvedRelation<'a> {
    /// `(start column, end column)` pairs oriented to the requested direction.
    pub fn pairs(&self) -> Vec<(&'a str, &'a str)> {
        self.relation
            .column_pairs()
            .map(|(s, e)| if self.reversed { (e, s) } else { (s, e) })
            .collect()
    }

    /// Columns used on the requested start table.
    pub fn start_columns(&self) -> &'a [String] {
        if self.reversed {
            &self.relation.end_columns
        } else {
            &self.relation.start_columns
        }
    }

    /// Columns used on the requested end table.
    pub fn end_columns(&self) -> &'a [String] {
        if self.reversed {
            &self.relation.start_columns
        } else {
            &self.relation.end_columns
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    TypedAligned,
    TypedReversed,
    UntypedAligned,
    UntypedReversed,
}

impl Tier {
    const ALL: [Tier; 4] = [
        Tier::TypedAligned,
        Tier::TypedReversed,
        Tier::UntypedAligned,
        Tier::UntypedReversed,
    ];

    fn enabled(self, config: ResolverConfig) -> bool {
        match self {
            Tier::TypedAligned => true,
            Tier::TypedReversed => !config.aligned_only,
            Tier::UntypedAligned => !config.qualified_only,
            Tier::UntypedReversed => !config.aligned_only && !config.qualified_only,
        }
    }

    fn reversed(self) -> bool {
        matches!(self, Tier::TypedReversed | Tier::UntypedReversed)
    }

    fn matches(self, relation: &Relation, start: &str, end: &str, crit: Option<&str>, strict: bool) -> bool {
        let tables = if self.reversed() {
            relation.is_reversed(start, end)
        } else {
            relation.is_aligned(start, end)
        };
        match self {
            Tier::TypedAligned | Tier::TypedReversed => {
                tables && crit.is_some_and(|c| ident::same(&relation.name, c))
            }
            Tier::UntypedAligned | Tier::UntypedReversed => tables && (!strict || crit.is_none()),
        }
    }
}

/// Resolves join edges against a shared catalog.
///
/// Holds no settings of its own: every lookup takes a [`ResolverConfig`].
#[derive(Debug, Clone)]
pub struct RelationResolver {
    catalog: Arc<Catalog>,
}

impl RelationResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_table_in_database(&self, name: &str) -> bool {
        self.catalog.is_table_in_database(name)
    }

    /// Find the relation joining `start` to `end` for `crit`.
    pub fn find(
        &self,
        start: &str,
        end: &str,
        crit: Option<&str>,
        config: ResolverConfig,
    ) -> Result<ResolvedRelation<'_>, ResolveError> {
        let crit = crit.map(str::trim).filter(|c| !c.is_empty());

        if let Some(link) = crit {
            if let Some(resolved) = self.resolve_link(start, end, link, config)? {
                return Ok(resolved);
            }
        }

        for tier in Tier::ALL.into_iter().filter(|t| t.enabled(config)) {
            let candidates: Vec<&Relation> = self
                .catalog
                .relations()
                .iter()
                .filter(|r| tier.matches(r, start, end, crit, config.strict))
                .collect();

            match candidates.as_slice() {
                [] => {}
                &[relation] => {
                    trace!(?tier, relation = %relation.name, start, end, "relation resolved");
                    return Ok(ResolvedRelation {
                        relation,
                        reversed: tier.reversed(),
                    });
                }
                many if config.strict => {
                    return Err(ResolveError::Ambiguous {
                        start: start.to_string(),
                        end: end.to_string(),
                        crit: crit.map(str::to_string),
                        count: many.len(),
                    });
                }
                many => {
                    trace!(?tier, count = many.len(), start, end, "ambiguous tier skipped");
                }
            }
        }

        Err(ResolveError::NotFound {
            start: start.to_string(),
            end: end.to_string(),
            crit: crit.map(str::to_string),
        })
    }

    /// Resolve a link name through the link dictionary.
    ///
    /// `Ok(None)` means the tiers should run with `link` as a plain relation name.
    fn resolve_link(
        &self,
        start: &str,
        end: &str,
        link: &str,
        config: ResolverConfig,
    ) -> Result<Option<ResolvedRelation<'_>>, ResolveError> {
        let Some(names) = self.catalog.links().get(link) else {
            return Ok(None);
        };

        let candidates: Vec<ResolvedRelation<'_>> = names
            .iter()
            .flat_map(|name| self.catalog.relations_named(name))
            .filter_map(|relation| {
                if relation.is_aligned(start, end) {
                    Some(ResolvedRelation { relation, reversed: false })
                } else if !config.aligned_only && relation.is_reversed(start, end) {
                    Some(ResolvedRelation { relation, reversed: true })
                } else {
                    None
                }
            })
            .collect();

        match candidates.as_slice() {
            [single] => {
                trace!(link, relation = %single.relation.name, "link resolved");
                Ok(Some(*single))
            }
            [] if config.strict => Err(ResolveError::UnresolvedLink {
                link: link.to_string(),
                start: start.to_string(),
                end: end.to_string(),
            }),
            many if config.strict => Err(ResolveError::Ambiguous {
                start: start.to_string(),
                end: end.to_string(),
                crit: Some(link.to_string()),
                count: many.len(),
            }),
            _ => {
                warn!(link, start, end, "link does not resolve, matching it as a relation name");
                Ok(None)
            }
        }
    }
}
