//! Entity language parser using chumsky.
//!
//! A select starts at one table and reaches further tables through nested
//! `JOIN ... OWNER` sections. Every table carries its own outputs, filters,
//! grouping and ordering.
//!
//! Priority: 50

use crate::ast::{
    Exists, Expression, Group, Join, Key, LogicalExpression, Order, Out, Select, Set, Table,
    UnaryLogicalExpression,
};
use crate::error::ParseError;
use crate::syntax::common::{
    self, format_errors, ident, integer, kw, symbol, Arithmetic, Extra, P,
};
use crate::syntax::QuerySyntax;
use chumsky::prelude::*;
use chumsky::recursive::Indirect;
use once_cell::sync::Lazy;
use regex::Regex;

/// Optional leading comments, then SELECT, WITH or an opening parenthesis
static IQL_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?:(?://[^\n]*|/\*.*?\*/)\s*)*(?:\(\s*)*(?:SELECT|WITH)\b").unwrap()
});

/// Entity language parser
pub struct IqlSyntax;

impl QuerySyntax for IqlSyntax {
    fn name(&self) -> &'static str {
        "iql"
    }

    fn can_handle(&self, input: &str) -> bool {
        IQL_PREFIX_RE.is_match(input)
    }

    fn parse(&self, input: &str) -> Result<crate::ast::Query, ParseError> {
        iql_query_parser()
            .parse(input)
            .into_result()
            .map_err(|errs| ParseError::Iql {
                message: format_errors(&errs, input),
            })
    }
}

type Declared<'src, T> = Recursive<Indirect<'src, 'src, &'src str, T, Extra<'src>>>;

#[derive(Debug, Clone)]
enum Clause {
    Out(Out),
    Filter(LogicalExpression),
    Having(LogicalExpression),
    Group(Key),
    Order(Key, bool),
}

fn key<'src>(expr: P<'src, Expression>) -> impl Parser<'src, &'src str, Key, Extra<'src>> + Clone {
    choice((
        kw("HEADER").ignore_then(ident()).map(Key::Header),
        expr.map(Key::Expression),
    ))
}

/// `table [alias] clause*`
fn entity<'src>(expr: P<'src, Expression>, logical: P<'src, LogicalExpression>) -> P<'src, Table> {
    let out = kw("OUT")
        .ignore_then(expr.clone())
        .then(ident().or_not())
        .then(integer().or_not())
        .map(|((expression, header), idx)| {
            Clause::Out(Out {
                expression,
                header,
                idx: idx.unwrap_or(0),
            })
        });
    let direction = choice((kw("ASC").to(true), kw("DESC").to(false)));

    let clause = choice((
        out,
        kw("FILTER").ignore_then(logical.clone()).map(Clause::Filter),
        kw("HAVING").ignore_then(logical).map(Clause::Having),
        kw("GROUP").ignore_then(key(expr.clone())).map(Clause::Group),
        kw("ORDER")
            .ignore_then(key(expr))
            .then(direction.or_not())
            .map(|(key, asc)| Clause::Order(key, asc.unwrap_or(true))),
    ));

    ident()
        .then(ident().or_not())
        .then(clause.repeated().collect::<Vec<_>>())
        .map(|((name, alias), clauses)| {
            let mut table = Table::new(name, alias.as_deref());
            for clause in clauses {
                match clause {
                    Clause::Out(out) => table.out.push(out),
                    Clause::Filter(p) => {
                        table.filter = LogicalExpression::conjoin(table.filter.take(), Some(p))
                    }
                    Clause::Having(p) => {
                        table.having = LogicalExpression::conjoin(table.having.take(), Some(p))
                    }
                    Clause::Group(key) => table.group.push(Group { key }),
                    Clause::Order(key, asc) => table.order.push(Order { key, asc }),
                }
            }
            table
        })
        .boxed()
}

/// `crit` or `ANY`
fn crit<'src>() -> impl Parser<'src, &'src str, Option<String>, Extra<'src>> + Clone {
    choice((kw("ANY").to(None), ident().map(Some)))
}

/// `JOIN [OPTIONAL] [INVERS] (crit | ANY) [REF name] entity join* OWNER`
fn join<'src>(entity: P<'src, Table>) -> P<'src, Join> {
    recursive(move |join| {
        kw("JOIN")
            .ignore_then(kw("OPTIONAL").or_not())
            .then(kw("INVERS").or_not())
            .then(crit())
            .then(kw("REF").ignore_then(ident()).or_not())
            .then(entity)
            .then(join.repeated().collect::<Vec<_>>())
            .then_ignore(kw("OWNER"))
            .map(
                |(((((optional, invers), crit), reference), table), joins)| Join {
                    crit,
                    reference,
                    optional: optional.is_some(),
                    invers: invers.is_some(),
                    table,
                    joins,
                },
            )
    })
    .boxed()
}

/// `EXISTS [ON parent] ( [INVERS] (crit | ANY) entity join* ) [AS alias]`
fn exists<'src>(entity: P<'src, Table>, join: P<'src, Join>) -> P<'src, LogicalExpression> {
    let body = kw("INVERS")
        .or_not()
        .then(crit())
        .then(entity)
        .then(join.repeated().collect::<Vec<_>>())
        .delimited_by(symbol('('), symbol(')'));

    kw("EXISTS")
        .ignore_then(kw("ON").ignore_then(ident()).or_not())
        .then(body)
        .then(kw("AS").ignore_then(ident()).or_not())
        .map(|((parent, (((invers, crit), table), joins)), alias)| {
            LogicalExpression::Var(UnaryLogicalExpression::Exists {
                parent,
                exists: Box::new(Exists {
                    crit,
                    invers: invers.is_some(),
                    table,
                    alias,
                    joins,
                }),
            })
        })
        .boxed()
}

/// `SELECT entity join* [ALL [FILTER pred] [HAVING pred]] [LIMIT n]`
fn select<'src>(
    entity: P<'src, Table>,
    join: P<'src, Join>,
    logical: P<'src, LogicalExpression>,
) -> impl Parser<'src, &'src str, Set, Extra<'src>> + Clone {
    let all = kw("ALL")
        .ignore_then(kw("FILTER").ignore_then(logical.clone()).or_not())
        .then(kw("HAVING").ignore_then(logical).or_not());

    kw("SELECT")
        .ignore_then(entity)
        .then(join.repeated().collect::<Vec<_>>())
        .then(all.or_not())
        .then(kw("LIMIT").ignore_then(integer()).or_not())
        .map(|(((start, joins), all), limit)| {
            let (filter, having) = all.unwrap_or((None, None));
            Set::select(Select {
                start,
                joins,
                filter,
                having,
                limit: limit.unwrap_or(0),
            })
        })
}

/// Parser for a complete entity language query
pub fn iql_query_parser<'src>(
) -> impl Parser<'src, &'src str, crate::ast::Query, Extra<'src>> {
    let mut set: Declared<'src, Set> = Recursive::declare();
    let mut logical: Declared<'src, LogicalExpression> = Recursive::declare();

    let expr = common::expression(set.clone().boxed(), Arithmetic::Operator);
    let entity = entity(expr.clone(), logical.clone().boxed());
    let join = join(entity.clone());
    let exists = exists(entity.clone(), join.clone());

    logical.define(common::logical(expr, set.clone().boxed(), Some(exists)));
    let select = select(entity, join, logical.boxed());
    set.define(common::set_operations(set.clone().boxed(), select));

    common::query(set.boxed())
}
