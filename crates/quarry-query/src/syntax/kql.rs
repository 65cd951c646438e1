//! Link language parser using chumsky.
//!
//! A query names its tables up front and links them with arrows:
//!
//! ```text
//! FIND orders o, o-placed->customers c, c<-filed+complaints k
//! WHERE o.amount > 100
//! RETURN o.id, c.name customer
//! ORDER HEADER customer
//! ```
//!
//! `+` marks an outer join and a leading `<` reverses the relation.
//!
//! Priority: 60 (higher than IQL's 50)

use crate::ast::{Expression, Join, Key, LogicalExpression, Order, Out, Select, Set, Table};
use crate::error::ParseError;
use crate::syntax::common::{
    self, format_errors, ident, integer, kw, symbol, Arithmetic, Extra, P,
};
use crate::syntax::QuerySyntax;
use chumsky::prelude::*;
use chumsky::recursive::Indirect;
use chumsky::span::SimpleSpan;
use once_cell::sync::Lazy;
use regex::Regex;

/// Optional leading comments, then FIND, or WITH blocks written with FIND
static KQL_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?:(?://[^\n]*|/\*.*?\*/)\s*)*(?:\(\s*)*(?:FIND\b|WITH\b.*\bFIND\b)")
        .unwrap()
});

/// Link language parser
pub struct KqlSyntax;

impl QuerySyntax for KqlSyntax {
    fn name(&self) -> &'static str {
        "kql"
    }

    fn can_handle(&self, input: &str) -> bool {
        KQL_PREFIX_RE.is_match(input)
    }

    fn parse(&self, input: &str) -> Result<crate::ast::Query, ParseError> {
        kql_query_parser()
            .parse(input)
            .into_result()
            .map_err(|errs| ParseError::Kql {
                message: format_errors(&errs, input),
            })
    }

    fn priority(&self) -> u8 {
        60
    }
}

#[derive(Debug, Clone)]
struct Link {
    from: String,
    join: Join,
}

/// `from ['<'] '-' [crit] ('-' | '+') ['>'] table alias`
fn link<'src>() -> impl Parser<'src, &'src str, Link, Extra<'src>> + Clone {
    let kind = choice((just('-').to(false), just('+').to(true))).padded();
    ident()
        .then(just('<').padded().or_not())
        .then_ignore(symbol('-'))
        .then(ident().or_not())
        .then(kind)
        .then_ignore(just('>').padded().or_not())
        .then(ident())
        .then(ident())
        .map(|(((((from, invers), crit), optional), name), alias)| Link {
            from,
            join: Join {
                crit,
                reference: None,
                optional,
                invers: invers.is_some(),
                table: Table::new(name, Some(&alias)),
                joins: Vec::new(),
            },
        })
}

/// Join list owned by the table with `alias`.
fn joins_of<'a>(select: &'a mut Select, alias: &str) -> Option<&'a mut Vec<Join>> {
    fn find<'a>(joins: &'a mut Vec<Join>, alias: &str) -> Option<&'a mut Vec<Join>> {
        for join in joins.iter_mut() {
            if join.table.has_alias(alias) {
                return Some(&mut join.joins);
            }
            if let Some(found) = find(&mut join.joins, alias) {
                return Some(found);
            }
        }
        None
    }
    if select.start.has_alias(alias) {
        return Some(&mut select.joins);
    }
    find(&mut select.joins, alias)
}

fn build<'src>(
    start: Table,
    links: Vec<Link>,
    span: SimpleSpan,
) -> Result<Select, Rich<'src, char>> {
    let mut select = Select::new(start);
    for Link { from, join } in links {
        match joins_of(&mut select, &from) {
            Some(joins) => joins.push(join),
            None => {
                return Err(Rich::custom(
                    span,
                    format!("link starts at unknown alias '{from}'"),
                ))
            }
        }
    }
    Ok(select)
}

/// `FIND table alias [, link]* [WHERE pred] [RETURN ...] [ORDER ...] [LIMIT n]`
fn find<'src>(
    expr: P<'src, Expression>,
    logical: P<'src, LogicalExpression>,
) -> impl Parser<'src, &'src str, Set, Extra<'src>> + Clone {
    let tables = kw("FIND")
        .ignore_then(ident())
        .then(ident())
        .then(symbol(',').ignore_then(link()).repeated().collect::<Vec<_>>())
        .try_map(|((name, alias), links), span| {
            build(Table::new(name, Some(&alias)), links, span)
        });

    let filter = choice((kw("WHERE"), kw("FILTER"))).ignore_then(logical);

    let returns = kw("RETURN").ignore_then(
        expr.clone()
            .then(ident().or_not())
            .separated_by(symbol(','))
            .at_least(1)
            .collect::<Vec<_>>(),
    );

    let direction = choice((kw("ASC").to(true), kw("DESC").to(false)));
    let key = choice((
        kw("HEADER").ignore_then(ident()).map(Key::Header),
        expr.map(Key::Expression),
    ));
    let order = kw("ORDER").ignore_then(
        key.then(direction.or_not())
            .map(|(key, asc)| Order {
                key,
                asc: asc.unwrap_or(true),
            })
            .separated_by(symbol(','))
            .at_least(1)
            .collect::<Vec<_>>(),
    );

    tables
        .then(filter.or_not())
        .then(returns.or_not())
        .then(order.or_not())
        .then(kw("LIMIT").ignore_then(integer()).or_not())
        .map(|((((mut select, filter), returns), order), limit)| {
            select.filter = filter;
            for (n, (expression, header)) in returns.unwrap_or_default().into_iter().enumerate() {
                select.start.out.push(Out {
                    expression,
                    header,
                    idx: n as u32 + 1,
                });
            }
            select.start.order = order.unwrap_or_default();
            select.limit = limit.unwrap_or(0);
            Set::select(select)
        })
}

/// Parser for a complete link language query
pub fn kql_query_parser<'src>(
) -> impl Parser<'src, &'src str, crate::ast::Query, Extra<'src>> {
    let mut set: Recursive<Indirect<'src, 'src, &'src str, Set, Extra<'src>>> =
        Recursive::declare();

    let expr = common::expression(set.clone().boxed(), Arithmetic::Function);
    let logical = common::logical(expr.clone(), set.clone().boxed(), None);
    set.define(common::set_operations(
        set.clone().boxed(),
        find(expr, logical),
    ));

    common::query(set.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, UnaryLogicalExpression};

    fn only_select(input: &str) -> Select {
        match KqlSyntax.parse(input).unwrap().set {
            Set::Select(select) => *select,
            other => panic!("expected a single select, got {other:?}"),
        }
    }

    // =========================================================================
    // can_handle tests
    // =========================================================================

    #[test]
    fn test_can_handle_find() {
        assert!(KqlSyntax.can_handle("FIND orders o"));
        assert!(KqlSyntax.can_handle("/* report */ find orders o"));
        assert!(KqlSyntax.can_handle("WITH x AS (FIND orders o) FIND x y"));
    }

    #[test]
    fn test_cannot_handle_select() {
        assert!(!KqlSyntax.can_handle("SELECT orders o"));
        assert!(!KqlSyntax.can_handle("WITH x AS (SELECT orders o) SELECT x"));
    }

    #[test]
    fn test_priority_is_higher_than_iql() {
        assert_eq!(KqlSyntax.priority(), 60);
    }

    // =========================================================================
    // Links
    // =========================================================================

    #[test]
    fn test_links_attach_to_their_source_alias() {
        let select = only_select(
            "FIND orders o, o-placed->customers c, c<-filed+complaints k, o--items i",
        );
        assert_eq!(select.joins.len(), 2);

        let customers = &select.joins[0];
        assert_eq!(customers.crit.as_deref(), Some("placed"));
        assert!(!customers.optional);
        assert!(!customers.invers);

        let complaints = &customers.joins[0];
        assert_eq!(complaints.table.name, "complaints");
        assert!(complaints.optional);
        assert!(complaints.invers);

        let items = &select.joins[1];
        assert_eq!(items.crit, None);
        assert_eq!(items.table.alias.as_deref(), Some("i"));
    }

    #[test]
    fn test_unknown_link_source_is_an_error() {
        let err = KqlSyntax
            .parse("FIND orders o, x-placed->customers c")
            .unwrap_err();
        assert!(err.to_string().contains("unknown alias 'x'"), "{err}");
    }

    // =========================================================================
    // Clauses
    // =========================================================================

    #[test]
    fn test_where_return_order_limit() {
        let select = only_select(
            "FIND orders o, o-placed->customers c \
             WHERE o.amount > 100 AND c.name LIKE 'A%' \
             RETURN o.id, c.name customer, o.amount * 2 \
             ORDER HEADER customer DESC, o.id \
             LIMIT 10",
        );
        assert!(matches!(select.filter, Some(LogicalExpression::And(ref p)) if p.len() == 2));
        assert!(select.start.filter.is_none());

        let idx: Vec<u32> = select.start.out.iter().map(|o| o.idx).collect();
        assert_eq!(idx, vec![1, 2, 3]);
        assert_eq!(select.start.out[1].header.as_deref(), Some("customer"));
        assert_eq!(
            select.start.out[2].expression,
            Expression::function(
                "multiply",
                vec![Expression::column(Some("o"), "amount"), Expression::Number(2.0)]
            )
        );

        assert_eq!(select.start.order.len(), 2);
        assert!(!select.start.order[0].asc);
        assert!(select.start.order[1].asc);
        assert_eq!(select.limit, 10);
    }

    #[test]
    fn test_filter_keyword_is_accepted_for_where() {
        let select = only_select("FIND orders o FILTER o.id IS NULL");
        assert!(matches!(
            select.filter,
            Some(LogicalExpression::Var(UnaryLogicalExpression::Comparison {
                op: CompareOp::IsNull,
                ..
            }))
        ));
    }

    #[test]
    fn test_union_of_finds() {
        let query = KqlSyntax
            .parse("FIND orders o RETURN o.id UNION FIND archive a RETURN a.id")
            .unwrap();
        assert!(matches!(query.set, Set::Compound { .. }));
    }

    #[test]
    fn test_alias_is_required() {
        assert!(KqlSyntax.parse("FIND orders").is_err());
    }
}
