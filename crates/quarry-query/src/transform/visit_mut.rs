//! Mutable traversal helpers for the rewrite passes.
//!
//! The read-only [`crate::walker`] answers questions about the tree; these
//! helpers hand out `&mut` access to selects and expressions so a pass can
//! rebuild the pieces it owns.

use crate::ast::*;

/// Call `f` on every select of the query, nested subqueries before the
/// select containing them.
pub(crate) fn for_each_select<E>(
    query: &mut Query,
    f: &mut dyn FnMut(&mut Select) -> Result<(), E>,
) -> Result<(), E> {
    for block in &mut query.blocks {
        set(&mut block.set, f)?;
    }
    set(&mut query.set, f)
}

fn set<E>(set_node: &mut Set, f: &mut dyn FnMut(&mut Select) -> Result<(), E>) -> Result<(), E> {
    match set_node {
        Set::Select(select) => {
            let mut result = Ok(());
            expressions(select, &mut |expression| {
                if let Expression::Set(inner) = expression {
                    if result.is_ok() {
                        result = set(inner, f);
                    }
                }
            });
            result?;
            f(select.as_mut())
        }
        Set::Compound { left, right, .. } => {
            set(left, f)?;
            set(right, f)
        }
    }
}

/// Call `f` on every expression owned by `select`, preorder. Subquery
/// bodies are not entered; `f` sees the `Expression::Set` node itself.
pub(crate) fn expressions(select: &mut Select, f: &mut dyn FnMut(&mut Expression)) {
    table(&mut select.start, f);
    if let Some(filter) = &mut select.filter {
        logical(filter, f);
    }
    if let Some(having) = &mut select.having {
        logical(having, f);
    }
    joins(&mut select.joins, f);
}

fn joins(joins_list: &mut [Join], f: &mut dyn FnMut(&mut Expression)) {
    for join in joins_list {
        table(&mut join.table, f);
        joins(&mut join.joins, f);
    }
}

fn table(table: &mut Table, f: &mut dyn FnMut(&mut Expression)) {
    for out in &mut table.out {
        expression(&mut out.expression, f);
    }
    if let Some(filter) = &mut table.filter {
        logical(filter, f);
    }
    if let Some(having) = &mut table.having {
        logical(having, f);
    }
    let keys = table
        .group
        .iter_mut()
        .map(|g| &mut g.key)
        .chain(table.order.iter_mut().map(|o| &mut o.key));
    for key in keys {
        if let Key::Expression(e) = key {
            expression(e, f);
        }
    }
}

fn logical(node: &mut LogicalExpression, f: &mut dyn FnMut(&mut Expression)) {
    match node {
        LogicalExpression::Var(unary) => match unary {
            UnaryLogicalExpression::Nested(inner) => logical(inner, f),
            UnaryLogicalExpression::Exists { exists, .. } => {
                table(&mut exists.table, f);
                joins(&mut exists.joins, f);
            }
            UnaryLogicalExpression::Comparison { left, right, .. } => {
                expression(left, f);
                for e in right {
                    expression(e, f);
                }
            }
        },
        LogicalExpression::Not(child) => logical(child, f),
        LogicalExpression::And(children) | LogicalExpression::Or(children) => {
            for child in children {
                logical(child, f);
            }
        }
    }
}

fn expression(node: &mut Expression, f: &mut dyn FnMut(&mut Expression)) {
    f(node);
    match node {
        Expression::BinaryOp { left, right, .. } => {
            expression(left, f);
            expression(right, f);
        }
        Expression::Grouped(inner) => expression(inner, f),
        Expression::Function(function) => {
            for arg in &mut function.args {
                expression(arg, f);
            }
        }
        _ => {}
    }
}
