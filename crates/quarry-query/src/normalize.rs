//! Logical expression normalization
//!
//! Pushes negations down with De Morgan's laws, removes double negations and
//! flattens nested `AND`/`OR` nodes of the same kind. Parenthesised
//! sub-formulas (`Var(Nested(..))`) are leaves here and keep their shape.

use crate::ast::LogicalExpression;

/// Normalize an optional predicate. `None` stays `None`.
pub fn normalize(expr: Option<LogicalExpression>) -> Option<LogicalExpression> {
    expr.map(LogicalExpression::normalized)
}

impl LogicalExpression {
    /// Normalized form of this formula. Idempotent.
    pub fn normalized(self) -> LogicalExpression {
        match self {
            LogicalExpression::Var(unary) => LogicalExpression::Var(unary),
            LogicalExpression::And(children) => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.normalized() {
                        LogicalExpression::And(grand) => flat.extend(grand),
                        other => flat.push(other),
                    }
                }
                LogicalExpression::And(flat)
            }
            LogicalExpression::Or(children) => {
                let mut flat = Vec::with_capacity(children.len());
                for child in children {
                    match child.normalized() {
                        LogicalExpression::Or(grand) => flat.extend(grand),
                        other => flat.push(other),
                    }
                }
                LogicalExpression::Or(flat)
            }
            LogicalExpression::Not(child) => match child.normalized() {
                LogicalExpression::Not(inner) => *inner,
                LogicalExpression::And(grand) => {
                    LogicalExpression::Or(grand.into_iter().map(negate).collect()).normalized()
                }
                LogicalExpression::Or(grand) => {
                    LogicalExpression::And(grand.into_iter().map(negate).collect()).normalized()
                }
                other => negate(other),
            },
        }
    }
}

fn negate(expr: LogicalExpression) -> LogicalExpression {
    LogicalExpression::Not(Box::new(expr))
}
