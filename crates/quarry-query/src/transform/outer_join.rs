//! Reject select filters that would turn an outer join into an inner join.

use quarry_catalog::ident;

use crate::ast::{Column, Join, Query, Select};
use crate::error::{SemanticError, TransformError};
use crate::transform::QueryTransform;
use crate::walker::{self, Ancestors, Visitor};

pub struct OuterJoinFilterTransform;

impl QueryTransform for OuterJoinFilterTransform {
    fn name(&self) -> &'static str {
        "outer_join_filter"
    }

    fn transform(&self, query: Query) -> Result<Query, TransformError> {
        walker::walk(&query, &mut Checker)?;
        Ok(query)
    }
}

struct Checker;

impl<'q> Visitor<'q> for Checker {
    type Error = SemanticError;

    fn visit_select(&mut self, _: &Ancestors<'q>, select: &'q Select) -> Result<(), SemanticError> {
        let mut optional = Vec::new();
        optional_joins(&select.joins, false, &mut optional);

        for join in optional {
            let table = &join.table;
            if table.having.is_some() {
                return Err(SemanticError::OuterJoinHaving {
                    alias: table.qualifier().to_string(),
                });
            }
            if let Some(filter) = &select.filter {
                let mut finder = AliasFinder {
                    alias: table.qualifier(),
                };
                if let Err(alias) = walker::walk_logical(filter, &mut finder) {
                    return Err(SemanticError::OuterJoinFilter { alias });
                }
            }
        }
        Ok(())
    }
}

/// Joins whose rows may be missing: optional joins and everything below them.
fn optional_joins<'q>(joins: &'q [Join], below_optional: bool, out: &mut Vec<&'q Join>) {
    for join in joins {
        let optional = below_optional || join.optional;
        if optional {
            out.push(join);
        }
        optional_joins(&join.joins, optional, out);
    }
}

/// Fails with the alias on the first column that references it. Columns of
/// a subquery that declares the alias itself belong to that subquery.
struct AliasFinder<'a> {
    alias: &'a str,
}

impl<'q> Visitor<'q> for AliasFinder<'_> {
    type Error = String;

    fn visit_column(&mut self, ancestors: &Ancestors<'q>, column: &'q Column) -> Result<(), String> {
        let Some(alias) = column.alias.as_deref() else {
            return Ok(());
        };
        if !ident::same(alias, self.alias) || ancestors.table(alias).is_some() {
            return Ok(());
        }
        Err(alias.to_string())
    }
}
