//! Expose relation columns from blocks that are joined like tables.
//!
//! When a join edge ends at a block, the SQL generator qualifies the block
//! side of the join predicate with the block's column names. Those columns
//! only exist if the block's leading table projects them, so this pass adds
//! the missing outs.

use tracing::trace;

use crate::ast::{Column, Exists, Expression, Join, Out, Query, Table, UnaryLogicalExpression};
use crate::error::{ResolveError, TransformError};
use crate::resolver::{RelationResolver, ResolverConfig};
use crate::transform::QueryTransform;
use crate::walker::{self, Ancestors, Visitor};

/// Resolves the catalog table a table reference stands for, following
/// blocks to their leading table.
pub(crate) fn catalog_table<'q>(
    resolver: &RelationResolver,
    query: &'q Query,
    name: &'q str,
) -> Result<&'q str, ResolveError> {
    let mut current = name;
    // a block whose leading table names another block; bounded by the block count
    for _ in 0..=query.blocks.len() {
        if resolver.is_table_in_database(current) {
            return Ok(current);
        }
        match query.block(current) {
            Some(block) => current = &block.set.leading_table().name,
            None => break,
        }
    }
    Err(ResolveError::UnknownTable {
        name: name.to_string(),
    })
}

pub struct BlockRelationTransform {
    resolver: RelationResolver,
    config: ResolverConfig,
}

impl BlockRelationTransform {
    pub fn new(resolver: RelationResolver, config: ResolverConfig) -> Self {
        Self { resolver, config }
    }
}

impl QueryTransform for BlockRelationTransform {
    fn name(&self) -> &'static str {
        "block_relation"
    }

    fn transform(&self, mut query: Query) -> Result<Query, TransformError> {
        if query.blocks.is_empty() {
            return Ok(query);
        }

        let mut collector = Collector {
            transform: self,
            query: &query,
            required: Vec::new(),
        };
        walker::walk(&query, &mut collector)?;
        let required = collector.required;

        for (block_id, columns) in required {
            let Some(block) = query
                .blocks
                .iter_mut()
                .find(|b| quarry_catalog::ident::same(&b.id, &block_id))
            else {
                continue;
            };
            let leading = block.set.leading_table_mut();
            for column in columns {
                if !projects(leading, &column) {
                    trace!(block = %block_id, %column, "exposing relation column");
                    leading.out.push(Out::new(Expression::Column(Column {
                        alias: Some(leading.qualifier().to_string()),
                        name: column,
                    })));
                }
            }
        }

        Ok(query)
    }
}

fn projects(table: &Table, column: &str) -> bool {
    table.out.iter().any(|out| match &out.expression {
        Expression::Column(c) => quarry_catalog::ident::same(&c.name, column),
        _ => false,
    })
}

struct Collector<'t, 'q> {
    transform: &'t BlockRelationTransform,
    query: &'q Query,
    required: Vec<(String, Vec<String>)>,
}

impl<'q> Collector<'_, 'q> {
    fn edge(
        &mut self,
        left: &'q Table,
        right: &'q Table,
        crit: Option<&str>,
        invers: bool,
    ) -> Result<(), ResolveError> {
        let (start, end) = if invers { (right, left) } else { (left, right) };
        let start_is_block = self.is_block(&start.name);
        let end_is_block = self.is_block(&end.name);
        if !start_is_block && !end_is_block {
            return Ok(());
        }

        let resolver = &self.transform.resolver;
        let start_table = catalog_table(resolver, self.query, &start.name)?;
        let end_table = catalog_table(resolver, self.query, &end.name)?;
        let resolved = resolver.find(start_table, end_table, crit, self.transform.config)?;

        if start_is_block {
            self.required
                .push((start.name.clone(), resolved.start_columns().to_vec()));
        }
        if end_is_block {
            self.required
                .push((end.name.clone(), resolved.end_columns().to_vec()));
        }
        Ok(())
    }

    fn is_block(&self, name: &str) -> bool {
        !self.transform.resolver.is_table_in_database(name) && self.query.block(name).is_some()
    }
}

impl<'q> Visitor<'q> for Collector<'_, 'q> {
    type Error = ResolveError;

    fn visit_join(&mut self, ancestors: &Ancestors<'q>, join: &'q Join) -> Result<(), ResolveError> {
        match ancestors.context_table() {
            Some(left) => self.edge(left, &join.table, join.crit.as_deref(), join.invers),
            None => Ok(()),
        }
    }

    fn visit_unary(
        &mut self,
        ancestors: &Ancestors<'q>,
        unary: &'q UnaryLogicalExpression,
    ) -> Result<(), ResolveError> {
        let UnaryLogicalExpression::Exists { parent, exists } = unary else {
            return Ok(());
        };
        let left = match parent {
            Some(alias) => ancestors.table(alias),
            None => ancestors.context_table(),
        };
        match left {
            Some(left) => {
                let Exists {
                    crit, invers, table, ..
                } = exists.as_ref();
                self.edge(left, table, crit.as_deref(), *invers)
            }
            None => Ok(()),
        }
    }
}
