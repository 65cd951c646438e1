//! Move single-table predicates from the select filter into the table they
//! constrain.
//!
//! Only the start table and inner joins outside any optional subtree receive
//! predicates. Moving a WHERE predicate into the ON test of an outer join
//! would change which rows survive, so those predicates stay select-scoped and
//! the outer join check rejects them afterwards.

use quarry_catalog::ident;
use tracing::trace;

use crate::ast::{
    Expression, Join, LogicalExpression, Query, Select, Table, UnaryLogicalExpression,
};
use crate::error::TransformError;
use crate::transform::visit_mut::for_each_select;
use crate::transform::QueryTransform;

pub struct PushFilterTransform;

impl QueryTransform for PushFilterTransform {
    fn name(&self) -> &'static str {
        "push_filter"
    }

    fn transform(&self, mut query: Query) -> Result<Query, TransformError> {
        for_each_select::<TransformError>(&mut query, &mut |select| {
            push(select);
            Ok(())
        })?;
        Ok(query)
    }
}

fn push(select: &mut Select) {
    let Some(filter) = select.filter.take() else {
        return;
    };

    let parts = match filter {
        LogicalExpression::And(children) => children,
        top @ (LogicalExpression::Or(_) | LogicalExpression::Not(_)) => {
            select.filter = Some(top);
            return;
        }
        other => vec![other],
    };

    let mut kept = Vec::new();
    for part in parts {
        let target = homogeneous_alias(&part)
            .and_then(|alias| pushable_table(select, &alias).map(|table| (alias, table)));
        match target {
            Some((alias, table)) => {
                trace!(%alias, table = %table.name, "pushing predicate into table filter");
                table.filter = LogicalExpression::conjoin(table.filter.take(), Some(part));
            }
            None => kept.push(part),
        }
    }
    select.filter = LogicalExpression::all(kept);
}

/// The start table or an inner join reachable without crossing an optional join.
fn pushable_table<'s>(select: &'s mut Select, alias: &str) -> Option<&'s mut Table> {
    fn find<'s>(joins: &'s mut [Join], alias: &str) -> Option<&'s mut Table> {
        for join in joins.iter_mut().filter(|j| !j.optional) {
            if join.table.has_alias(alias) {
                return Some(&mut join.table);
            }
            if let Some(table) = find(&mut join.joins, alias) {
                return Some(table);
            }
        }
        None
    }

    if select.start.has_alias(alias) {
        return Some(&mut select.start);
    }
    find(&mut select.joins, alias)
}

/// Table aliases referenced by a subtree.
#[derive(Debug, Clone, PartialEq)]
enum Scope {
    /// No table referenced, e.g. a literal.
    Free,
    Single(String),
    /// Several aliases, or a construct whose tables cannot be pinned down.
    Mixed,
}

impl Scope {
    fn merge(self, other: Scope) -> Scope {
        match (self, other) {
            (Scope::Mixed, _) | (_, Scope::Mixed) => Scope::Mixed,
            (Scope::Free, scope) | (scope, Scope::Free) => scope,
            (Scope::Single(a), Scope::Single(b)) if ident::same(&a, &b) => Scope::Single(a),
            _ => Scope::Mixed,
        }
    }

    fn merge_all(scopes: impl IntoIterator<Item = Scope>) -> Scope {
        scopes.into_iter().fold(Scope::Free, Scope::merge)
    }
}

/// The one table alias `expr` references, if there is exactly one.
///
/// Literals are neutral: `o.amount > 10` belongs to `o`. Unqualified columns,
/// subqueries, nested formulas, negations and EXISTS tests never belong to a
/// single table.
pub fn homogeneous_alias(expr: &LogicalExpression) -> Option<String> {
    match logical_scope(expr) {
        Scope::Single(alias) => Some(alias),
        Scope::Free | Scope::Mixed => None,
    }
}

fn logical_scope(expr: &LogicalExpression) -> Scope {
    match expr {
        LogicalExpression::Var(unary) => unary_scope(unary),
        LogicalExpression::Not(_) => Scope::Mixed,
        LogicalExpression::And(children) | LogicalExpression::Or(children) => {
            Scope::merge_all(children.iter().map(logical_scope))
        }
    }
}

fn unary_scope(unary: &UnaryLogicalExpression) -> Scope {
    match unary {
        UnaryLogicalExpression::Nested(_) | UnaryLogicalExpression::Exists { .. } => Scope::Mixed,
        UnaryLogicalExpression::Comparison { left, right, .. } => {
            Scope::merge_all(std::iter::once(left).chain(right).map(expression_scope))
        }
    }
}

fn expression_scope(expr: &Expression) -> Scope {
    match expr {
        Expression::Identity(alias) => Scope::Single(alias.clone()),
        Expression::Column(column) => match &column.alias {
            Some(alias) => Scope::Single(alias.clone()),
            None => Scope::Mixed,
        },
        Expression::Function(function) => {
            Scope::merge_all(function.args.iter().map(expression_scope))
        }
        Expression::BinaryOp { left, right, .. } => {
            expression_scope(left).merge(expression_scope(right))
        }
        Expression::Grouped(inner) => expression_scope(inner),
        Expression::Set(_) => Scope::Mixed,
        Expression::Text(_)
        | Expression::Number(_)
        | Expression::Date(_)
        | Expression::DateTime(_)
        | Expression::Time(_) => Scope::Free,
    }
}
