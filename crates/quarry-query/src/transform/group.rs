//! Infer GROUP BY for selects that aggregate.
//!
//! Once any projection aggregates (or a HAVING exists), every projected
//! expression without an aggregate must be grouped. Missing groups are added
//! to the select's start table.

use tracing::trace;

use crate::ast::{Expression, Group, Key, Query, Select};
use crate::error::TransformError;
use crate::transform::visit_mut::for_each_select;
use crate::transform::QueryTransform;

pub struct GroupTransform;

impl QueryTransform for GroupTransform {
    fn name(&self) -> &'static str {
        "group"
    }

    fn transform(&self, mut query: Query) -> Result<Query, TransformError> {
        for_each_select::<TransformError>(&mut query, &mut |select| {
            infer_groups(select);
            Ok(())
        })?;
        Ok(query)
    }
}

fn infer_groups(select: &mut Select) {
    let tables = select.tables();
    let projected: Vec<&Expression> = tables
        .iter()
        .flat_map(|t| t.out.iter().map(|o| &o.expression))
        .collect();

    let aggregates = projected.iter().any(|e| e.contains_aggregate());
    let having = select.having.is_some() || tables.iter().any(|t| t.having.is_some());
    if !aggregates && !having {
        return;
    }

    let mut grouped: Vec<&Expression> = tables
        .iter()
        .flat_map(|t| t.group.iter())
        .filter_map(|g| match &g.key {
            Key::Expression(e) => Some(e),
            Key::Header(_) => None,
        })
        .collect();

    let mut missing = Vec::new();
    for expression in projected {
        // literals would read as ordinals in GROUP BY
        if expression.contains_aggregate() || expression.is_literal() {
            continue;
        }
        if grouped.contains(&expression) {
            continue;
        }
        grouped.push(expression);
        missing.push(expression.clone());
    }

    if !missing.is_empty() {
        trace!(table = %select.start.name, count = missing.len(), "inferred GROUP BY");
    }
    select.start.group.extend(missing.into_iter().map(|expression| Group {
        key: Key::Expression(expression),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, Join, LogicalExpression, Out, Set, Table};

    fn run(select: Select) -> Select {
        let query = GroupTransform
            .transform(Query::new(Set::select(select)))
            .unwrap();
        match query.set {
            Set::Select(select) => *select,
            Set::Compound { .. } => unreachable!(),
        }
    }

    fn group_keys(select: &Select) -> Vec<Key> {
        select.start.group.iter().map(|g| g.key.clone()).collect()
    }

    fn sum(col: &str) -> Expression {
        Expression::function("SUM", vec![Expression::column(Some("o"), col)])
    }

    #[test]
    fn test_groups_plain_columns_next_to_aggregates() {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(Expression::column(Some("o"), "customer_id")));
        start.out.push(Out::new(sum("amount")));
        let select = run(Select::new(start));
        assert_eq!(
            group_keys(&select),
            vec![Key::Expression(Expression::column(Some("o"), "customer_id"))]
        );
    }

    #[test]
    fn test_collects_outs_from_joined_tables() {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(sum("amount")));
        let mut customers = Table::new("customers", Some("c"));
        customers.out.push(Out::new(Expression::column(Some("c"), "name")));
        let mut select = Select::new(start);
        select.joins.push(Join::new(Some("placed"), customers));

        let select = run(select);
        assert_eq!(
            group_keys(&select),
            vec![Key::Expression(Expression::column(Some("c"), "name"))]
        );
        assert!(select.joins[0].table.group.is_empty());
    }

    #[test]
    fn test_having_alone_triggers_grouping() {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(Expression::column(Some("o"), "customer_id")));
        let mut select = Select::new(start);
        select.having = Some(LogicalExpression::comparison(
            sum("amount"),
            CompareOp::Gt,
            vec![Expression::Number(100.0)],
        ));
        assert_eq!(group_keys(&run(select)).len(), 1);
    }

    #[test]
    fn test_no_aggregate_no_group() {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(Expression::column(Some("o"), "id")));
        assert!(group_keys(&run(Select::new(start))).is_empty());
    }

    #[test]
    fn test_existing_groups_are_not_duplicated() {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(Expression::column(Some("o"), "customer_id")));
        start.out.push(Out::new(Expression::Number(1.0)));
        start.out.push(Out::new(sum("amount")));
        start.group.push(Group {
            key: Key::Expression(Expression::column(Some("o"), "customer_id")),
        });
        let once = run(Select::new(start));
        assert_eq!(group_keys(&once).len(), 1);
        assert_eq!(run(once.clone()), once);
    }
}
