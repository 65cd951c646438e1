//! Replace identity references with primary key columns.
//!
//! `count(o)` means "count the rows of the table aliased `o`"; SQL needs a
//! column, so the reference becomes the table's first primary key column.

use std::collections::HashMap;

use quarry_catalog::ident;
use tracing::trace;

use crate::ast::{Column, Expression, Query, Select};
use crate::error::{SemanticError, TransformError};
use crate::resolver::RelationResolver;
use crate::transform::visit_mut::{expressions, for_each_select};
use crate::transform::QueryTransform;
use crate::walker;

pub struct IdentityTransform {
    resolver: RelationResolver,
}

impl IdentityTransform {
    pub fn new(resolver: RelationResolver) -> Self {
        Self { resolver }
    }

    fn resolve(&self, select: &mut Select) -> Result<(), SemanticError> {
        let mut aliases = Vec::new();
        expressions(select, &mut |expression| {
            if let Expression::Function(function) = expression {
                for arg in &function.args {
                    if let Expression::Identity(alias) = arg {
                        aliases.push(alias.clone());
                    }
                }
            }
        });
        if aliases.is_empty() {
            return Ok(());
        }

        let mut columns = HashMap::new();
        for alias in aliases {
            let key = ident::key(&alias);
            if columns.contains_key(&key) {
                continue;
            }
            let table = walker::find_table(select, &alias)
                .ok_or_else(|| SemanticError::identity(&alias, "no table with this alias"))?;
            let entry = self.resolver.catalog().table(&table.name).ok_or_else(|| {
                SemanticError::identity(&alias, format!("'{}' is not a catalog table", table.name))
            })?;
            let pk = entry.primary_key().ok_or_else(|| {
                SemanticError::identity(&alias, format!("'{}' has no primary key", table.name))
            })?;
            trace!(%alias, table = %table.name, column = %pk.name, "identity resolved");
            columns.insert(
                key,
                Column {
                    alias: Some(table.qualifier().to_string()),
                    name: pk.name.clone(),
                },
            );
        }

        expressions(select, &mut |expression| {
            if let Expression::Function(function) = expression {
                for arg in &mut function.args {
                    if let Expression::Identity(alias) = arg {
                        if let Some(column) = columns.get(&ident::key(alias)) {
                            *arg = Expression::Column(column.clone());
                        }
                    }
                }
            }
        });
        Ok(())
    }
}

impl QueryTransform for IdentityTransform {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn transform(&self, mut query: Query) -> Result<Query, TransformError> {
        for_each_select(&mut query, &mut |select| {
            self.resolve(select).map_err(TransformError::from)
        })?;
        Ok(query)
    }
}
