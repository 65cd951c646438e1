//! Move aggregate comparisons from the select filter to HAVING.

use tracing::trace;

use crate::ast::{LogicalExpression, Query, Select, UnaryLogicalExpression};
use crate::error::TransformError;
use crate::transform::visit_mut::for_each_select;
use crate::transform::QueryTransform;

pub struct HavingTransform;

impl QueryTransform for HavingTransform {
    fn name(&self) -> &'static str {
        "having"
    }

    fn transform(&self, mut query: Query) -> Result<Query, TransformError> {
        for_each_select::<TransformError>(&mut query, &mut |select| {
            split(select);
            Ok(())
        })?;
        Ok(query)
    }
}

/// A comparison whose left operand aggregates.
fn is_having(expr: &LogicalExpression) -> bool {
    matches!(
        expr,
        LogicalExpression::Var(UnaryLogicalExpression::Comparison { left, .. })
            if left.contains_aggregate()
    )
}

fn split(select: &mut Select) {
    let Some(filter) = select.filter.take() else {
        return;
    };

    let (moved, kept) = match filter {
        filter if is_having(&filter) => (Some(filter), None),
        LogicalExpression::And(children) => {
            let (having, rest): (Vec<_>, Vec<_>) = children.into_iter().partition(is_having);
            (LogicalExpression::all(having), LogicalExpression::all(rest))
        }
        other => (None, Some(other)),
    };

    if moved.is_some() {
        trace!(table = %select.start.name, "moving aggregate predicate to HAVING");
    }
    select.filter = kept;
    select.having = LogicalExpression::conjoin(select.having.take(), moved);
}
