//! Shared parser primitives for the surface syntaxes.
//!
//! Both languages share the lexical layer, scalar expressions, predicates,
//! set operations and the `WITH` block frame. They differ in how a single
//! select is written and in how arithmetic lands in the tree.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chumsky::extra;
use chumsky::prelude::*;

use crate::ast::{
    ArithmeticOp, Block, Column, CompareOp, Expression, LogicalExpression, Query, Set, SetOperator,
    UnaryLogicalExpression,
};
use crate::functions;

/// Extra type for parsers - uses Rich errors for better messages
pub type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Type-erased parser, used where grammars recurse into each other.
pub type P<'src, T> = Boxed<'src, 'src, &'src str, T, Extra<'src>>;

/// Words that are never identifiers unless double quoted.
pub const RESERVED: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "DATE", "DESC", "EXISTS", "FILTER", "FIND",
    "GROUP", "HAVING", "HEADER", "IN", "INTERSECT", "INVERS", "IS", "JOIN", "LIKE", "LIMIT",
    "MINUS", "NOT", "NULL", "ON", "OPTIONAL", "OR", "ORDER", "OUT", "OWNER", "REF", "RETURN",
    "SELECT", "TIME", "TIMESTAMP", "UNION", "WHERE", "WITH",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

/// How `+ - * /` are represented in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    /// `Expression::BinaryOp`
    Operator,
    /// Calls to `add`, `minus`, `multiply` and `divide`
    Function,
}

// ============================================================================
// Lexical parsers
// ============================================================================

fn word<'src>() -> impl Parser<'src, &'src str, &'src str, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated(),
        )
        .to_slice()
}

/// Case-insensitive keyword matching a whole word.
pub fn kw<'src>(keyword: &'static str) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    word()
        .try_map(move |s: &str, span| {
            if s.eq_ignore_ascii_case(keyword) {
                Ok(())
            } else {
                Err(Rich::custom(span, format!("expected keyword '{keyword}'")))
            }
        })
        .padded()
}

/// Identifier: a non-reserved word, or any text in double quotes (unquoted).
pub fn ident<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let plain = word().try_map(|s: &str, span| {
        if is_reserved(s) {
            Err(Rich::custom(span, format!("'{s}' is a reserved word")))
        } else {
            Ok(s.to_string())
        }
    });
    let quoted = just('"')
        .ignore_then(
            choice((just("\"\"").to('"'), none_of("\"")))
                .repeated()
                .at_least(1)
                .collect::<String>(),
        )
        .then_ignore(just('"'));
    choice((quoted, plain)).padded().labelled("identifier")
}

pub fn symbol<'src>(c: char) -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    just(c).padded().ignored()
}

/// Unsigned integer, e.g. for `LIMIT`.
pub fn integer<'src>() -> impl Parser<'src, &'src str, u32, Extra<'src>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<u32>()
                .map_err(|_| Rich::custom(span, "integer overflow"))
        })
        .padded()
        .labelled("integer")
}

pub fn number<'src>() -> impl Parser<'src, &'src str, f64, Extra<'src>> + Clone {
    let digits = any().filter(|c: &char| c.is_ascii_digit()).repeated().at_least(1);
    just('-')
        .or_not()
        .then(digits)
        .then(just('.').then(digits).or_not())
        .to_slice()
        .try_map(|s: &str, span| {
            s.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| Rich::custom(span, "invalid number"))
        })
        .labelled("number")
}

/// `'text'` with `''` or `\'` escaping a quote.
pub fn text<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escape = choice((just("''").to('\''), just("\\'").to('\'')));
    just('\'')
        .ignore_then(choice((escape, none_of("'"))).repeated().collect::<String>())
        .then_ignore(just('\''))
        .labelled("string literal")
}

/// `DATE '...'`, `TIMESTAMP '...'` and `TIME '...'`.
fn temporal<'src>() -> impl Parser<'src, &'src str, Expression, Extra<'src>> + Clone {
    let date = kw("DATE").ignore_then(text()).try_map(|s, span| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Expression::Date)
            .map_err(|e| Rich::custom(span, format!("invalid date '{s}': {e}")))
    });
    let timestamp = kw("TIMESTAMP").ignore_then(text()).try_map(|s, span| {
        let value = s.trim();
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
            .map(Expression::DateTime)
            .map_err(|e| Rich::custom(span, format!("invalid timestamp '{s}': {e}")))
    });
    let time = kw("TIME").ignore_then(text()).try_map(|s, span| {
        NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
            .map(Expression::Time)
            .map_err(|e| Rich::custom(span, format!("invalid time '{s}': {e}")))
    });
    choice((timestamp, time, date))
}

/// Leading `//` and `/* */` comments, one description line per comment line.
fn description<'src>() -> impl Parser<'src, &'src str, Option<String>, Extra<'src>> + Clone {
    let line = just("//")
        .ignore_then(none_of("\n").repeated().to_slice())
        .map(|s: &str| vec![s.trim().to_string()]);
    let block = just("/*")
        .ignore_then(any().and_is(just("*/").not()).repeated().to_slice())
        .then_ignore(just("*/"))
        .map(|s: &str| {
            s.lines()
                .map(|l| l.trim().trim_start_matches('*').trim().to_string())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
        });
    choice((line, block))
        .padded()
        .repeated()
        .collect::<Vec<_>>()
        .map(|comments| {
            let lines: Vec<String> = comments.into_iter().flatten().collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        })
}

// ============================================================================
// Expressions
// ============================================================================

fn fold(arithmetic: Arithmetic, first: Expression, rest: Vec<(ArithmeticOp, Expression)>) -> Expression {
    rest.into_iter().fold(first, |left, (op, right)| match arithmetic {
        Arithmetic::Operator => Expression::binary(op, left, right),
        Arithmetic::Function => {
            Expression::function(functions::arithmetic_name(op), vec![left, right])
        }
    })
}

/// Scalar expressions. `set` parses a nested query body for subqueries.
pub fn expression<'src>(set: P<'src, Set>, arithmetic: Arithmetic) -> P<'src, Expression> {
    recursive(move |expr| {
        let subquery = set
            .clone()
            .delimited_by(symbol('('), symbol(')'))
            .map(|s| Expression::Set(Box::new(s)));
        let grouped = expr
            .clone()
            .delimited_by(symbol('('), symbol(')'))
            .map(|e| Expression::Grouped(Box::new(e)));

        // a bare name inside an argument list refers to a table alias
        let argument = expr.clone().map(|e| match e {
            Expression::Column(Column { alias: None, name }) => Expression::Identity(name),
            other => other,
        });
        let function = ident()
            .then(
                argument
                    .separated_by(symbol(','))
                    .collect::<Vec<_>>()
                    .delimited_by(symbol('('), symbol(')')),
            )
            .map(|(name, args)| Expression::function(name, args));

        let column = ident()
            .then(just('.').padded().ignore_then(ident()).or_not())
            .map(|(first, second)| match second {
                Some(name) => Expression::column(Some(&first), name),
                None => Expression::column(None, first),
            });

        let atom = choice((
            subquery,
            grouped,
            temporal(),
            number().map(Expression::Number),
            text().map(Expression::Text),
            function,
            column,
        ))
        .padded()
        .boxed();

        let product = atom
            .clone()
            .then(
                choice((
                    just('*').to(ArithmeticOp::Mul),
                    just('/').to(ArithmeticOp::Div),
                ))
                .padded()
                .then(atom)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(move |(first, rest)| fold(arithmetic, first, rest))
            .boxed();

        product
            .clone()
            .then(
                choice((
                    just('+').to(ArithmeticOp::Add),
                    just('-').to(ArithmeticOp::Sub),
                ))
                .padded()
                .then(product)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(move |(first, rest)| fold(arithmetic, first, rest))
    })
    .labelled("expression")
    .boxed()
}

// ============================================================================
// Predicates
// ============================================================================

fn negated(not: Option<()>, positive: CompareOp, negative: CompareOp) -> CompareOp {
    if not.is_some() {
        negative
    } else {
        positive
    }
}

fn comparison<'src>(expr: P<'src, Expression>, set: P<'src, Set>) -> P<'src, LogicalExpression> {
    let operator = choice((
        just("<>").to(CompareOp::Ne),
        just("!=").to(CompareOp::Ne),
        just("<=").to(CompareOp::Le),
        just(">=").to(CompareOp::Ge),
        just('=').to(CompareOp::Eq),
        just('<').to(CompareOp::Lt),
        just('>').to(CompareOp::Gt),
    ))
    .padded();

    let list = choice((
        set.map(|s| vec![Expression::Set(Box::new(s))]),
        expr.clone()
            .separated_by(symbol(','))
            .at_least(1)
            .collect::<Vec<_>>(),
    ))
    .delimited_by(symbol('('), symbol(')'));

    let suffix = choice((
        kw("IS")
            .ignore_then(kw("NOT").or_not())
            .then_ignore(kw("NULL"))
            .map(|not| (negated(not, CompareOp::IsNull, CompareOp::IsNotNull), Vec::new())),
        kw("BETWEEN")
            .ignore_then(expr.clone())
            .then_ignore(kw("AND"))
            .then(expr.clone())
            .map(|(low, high)| (CompareOp::Between, vec![low, high])),
        kw("NOT")
            .or_not()
            .then_ignore(kw("LIKE"))
            .then(expr.clone())
            .map(|(not, pattern)| (negated(not, CompareOp::Like, CompareOp::NotLike), vec![pattern])),
        kw("NOT")
            .or_not()
            .then_ignore(kw("IN"))
            .then(list)
            .map(|(not, items)| (negated(not, CompareOp::In, CompareOp::NotIn), items)),
        operator.then(expr.clone()).map(|(op, right)| (op, vec![right])),
    ));

    expr.then(suffix)
        .map(|(left, (op, right))| LogicalExpression::comparison(left, op, right))
        .boxed()
}

fn combine(
    mut parts: Vec<LogicalExpression>,
    make: fn(Vec<LogicalExpression>) -> LogicalExpression,
) -> LogicalExpression {
    if parts.len() == 1 {
        if let Some(single) = parts.pop() {
            return single;
        }
    }
    make(parts)
}

/// Predicates with `NOT` binding tighter than `AND`, `AND` tighter than `OR`.
/// `extra` adds language specific primaries such as `EXISTS`.
pub fn logical<'src>(
    expr: P<'src, Expression>,
    set: P<'src, Set>,
    extra: Option<P<'src, LogicalExpression>>,
) -> P<'src, LogicalExpression> {
    recursive(move |logical| {
        let parenthesised = logical
            .clone()
            .delimited_by(symbol('('), symbol(')'))
            .boxed();
        let nested = parenthesised
            .clone()
            .map(|inner| LogicalExpression::Var(UnaryLogicalExpression::Nested(Box::new(inner))));
        let comparison = comparison(expr.clone(), set.clone());

        let primary = match extra.clone() {
            Some(extra) => choice((extra, nested.boxed(), comparison)).boxed(),
            None => choice((nested.boxed(), comparison)).boxed(),
        };

        let unary = recursive(move |unary| {
            kw("NOT")
                .ignore_then(choice((parenthesised, unary)))
                .map(|inner| LogicalExpression::Not(Box::new(inner)))
                .or(primary)
        });

        unary
            .separated_by(kw("AND"))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|parts| combine(parts, LogicalExpression::And))
            .separated_by(kw("OR"))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|parts| combine(parts, LogicalExpression::Or).normalized())
    })
    .labelled("predicate")
    .boxed()
}

// ============================================================================
// Query frame
// ============================================================================

/// Left associative set operations over `select` terms.
pub fn set_operations<'src, S>(set: P<'src, Set>, select: S) -> P<'src, Set>
where
    S: Parser<'src, &'src str, Set, Extra<'src>> + Clone + 'src,
{
    let term = choice((set.delimited_by(symbol('('), symbol(')')), select.boxed()));
    let operator = choice((
        kw("UNION").then(kw("ALL")).to(SetOperator::UnionAll),
        kw("UNION").to(SetOperator::Union),
        kw("INTERSECT").to(SetOperator::Intersect),
        kw("MINUS").to(SetOperator::Minus),
    ));
    term.clone()
        .then(operator.then(term).repeated().collect::<Vec<_>>())
        .map(|(first, rest)| {
            rest.into_iter()
                .fold(first, |left, (op, right)| Set::compound(op, left, right))
        })
        .boxed()
}

/// `[comments] [WITH id AS ( set ), ...] set`
pub fn query<'src>(set: P<'src, Set>) -> impl Parser<'src, &'src str, Query, Extra<'src>> {
    let block = ident()
        .then_ignore(kw("AS"))
        .then(set.clone().delimited_by(symbol('('), symbol(')')))
        .map(|(id, set)| Block { id, set });
    let blocks = kw("WITH")
        .ignore_then(block.separated_by(symbol(',')).at_least(1).collect::<Vec<_>>())
        .or_not()
        .map(Option::unwrap_or_default);

    description()
        .then(blocks)
        .then(set)
        .then_ignore(end())
        .map(|((description, blocks), set)| Query {
            description,
            blocks,
            set,
        })
}

// ============================================================================
// Error formatting
// ============================================================================

/// Format chumsky errors for human consumption
pub fn format_errors(errs: &[Rich<'_, char>], input: &str) -> String {
    errs.iter()
        .map(|e| {
            let start = e.span().start;
            let line = input[..start].matches('\n').count() + 1;
            let col = start - input[..start].rfind('\n').map_or(0, |i| i + 1);

            let found = e
                .found()
                .map_or("end of input".to_string(), |c| format!("'{c}'"));

            format!("Line {line}, column {}: {} (found {found})", col + 1, e.reason())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_stub<'src>() -> P<'src, Set> {
        kw("NOSET").to(Set::select(crate::ast::Select::new(crate::ast::Table::new("x", None))))
            .boxed()
    }

    fn expr(input: &str) -> Expression {
        expression(set_stub(), Arithmetic::Operator)
            .then_ignore(end())
            .parse(input)
            .into_result()
            .unwrap()
    }

    fn pred(input: &str) -> LogicalExpression {
        logical(expression(set_stub(), Arithmetic::Operator), set_stub(), None)
            .then_ignore(end())
            .parse(input)
            .into_result()
            .unwrap()
    }

    fn eq(alias: &str, col: &str, n: f64) -> LogicalExpression {
        LogicalExpression::comparison(
            Expression::column(Some(alias), col),
            CompareOp::Eq,
            vec![Expression::Number(n)],
        )
    }

    // ===== lexical =====

    #[test]
    fn test_keywords_are_case_insensitive_whole_words() {
        assert!(kw("SELECT").parse("select").into_result().is_ok());
        assert!(kw("SELECT").parse("selection").into_result().is_err());
    }

    #[test]
    fn test_reserved_words_need_quotes() {
        assert!(ident().parse("order").into_result().is_err());
        assert_eq!(ident().parse("\"order\"").into_result().unwrap(), "order");
        assert_eq!(ident().parse("order_items").into_result().unwrap(), "order_items");
    }

    #[test]
    fn test_text_escapes() {
        assert_eq!(text().parse("'O''Brien'").into_result().unwrap(), "O'Brien");
        assert_eq!(text().parse("'O\\'Brien'").into_result().unwrap(), "O'Brien");
    }

    #[test]
    fn test_numbers_must_be_finite() {
        assert_eq!(number().parse("-12.5").into_result().unwrap(), -12.5);

        let huge = "9".repeat(400);
        let errs = number().parse(huge.as_str()).into_result().unwrap_err();
        assert!(format_errors(&errs, &huge).contains("invalid number"));
    }

    #[test]
    fn test_description_from_comments() {
        let parsed = description()
            .then_ignore(end())
            .parse("// first\n/* second\n * third */\n")
            .into_result()
            .unwrap();
        assert_eq!(parsed.as_deref(), Some("first\nsecond\nthird"));
    }

    // ===== expressions =====

    #[test]
    fn test_precedence() {
        let parsed = expr("o.a + o.b * 2");
        assert_eq!(
            parsed,
            Expression::binary(
                ArithmeticOp::Add,
                Expression::column(Some("o"), "a"),
                Expression::binary(
                    ArithmeticOp::Mul,
                    Expression::column(Some("o"), "b"),
                    Expression::Number(2.0)
                )
            )
        );
    }

    #[test]
    fn test_function_arithmetic_mode() {
        let parsed = expression(set_stub(), Arithmetic::Function)
            .parse("o.a - 1")
            .into_result()
            .unwrap();
        assert_eq!(
            parsed,
            Expression::function(
                "minus",
                vec![Expression::column(Some("o"), "a"), Expression::Number(1.0)]
            )
        );
    }

    #[test]
    fn test_bare_argument_is_identity() {
        assert_eq!(
            expr("count(o)"),
            Expression::function("count", vec![Expression::Identity("o".into())])
        );
    }

    #[test]
    fn test_temporal_literals() {
        assert_eq!(
            expr("DATE '2024-01-31'"),
            Expression::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
        assert!(matches!(expr("timestamp '2024-01-31T10:00:00'"), Expression::DateTime(_)));
        assert!(matches!(expr("TIME '10:00:00.5'"), Expression::Time(_)));
    }

    // ===== predicates =====

    #[test]
    fn test_not_binds_tighter_than_and_than_or() {
        let parsed = pred("o.a = 1 OR NOT o.b = 2 AND o.c = 3");
        assert_eq!(
            parsed,
            LogicalExpression::Or(vec![
                eq("o", "a", 1.0),
                LogicalExpression::And(vec![
                    LogicalExpression::Not(Box::new(eq("o", "b", 2.0))),
                    eq("o", "c", 3.0),
                ]),
            ])
        );
    }

    #[test]
    fn test_between_and_is_not_a_conjunction() {
        let parsed = pred("o.a BETWEEN 1 AND 2 AND o.c = 3");
        match parsed {
            LogicalExpression::And(children) => assert_eq!(children.len(), 2),
            other => panic!("expected AND, got {other:?}"),
        }
    }

    #[test]
    fn test_parenthesised_predicate_is_nested() {
        let parsed = pred("(o.a = 1 OR o.b = 2) AND o.c = 3");
        let LogicalExpression::And(children) = parsed else {
            panic!("expected AND");
        };
        assert!(matches!(
            children[0],
            LogicalExpression::Var(UnaryLogicalExpression::Nested(_))
        ));
    }

    #[test]
    fn test_not_of_parenthesised_group_is_normalized() {
        let parsed = pred("NOT (o.a = 1 OR o.b IS NULL)");
        assert_eq!(
            parsed,
            LogicalExpression::And(vec![
                LogicalExpression::Not(Box::new(eq("o", "a", 1.0))),
                LogicalExpression::Not(Box::new(LogicalExpression::comparison(
                    Expression::column(Some("o"), "b"),
                    CompareOp::IsNull,
                    vec![]
                ))),
            ])
        );
    }

    #[test]
    fn test_in_like_and_null_forms() {
        assert!(matches!(
            pred("o.a NOT IN (1, 2, 3)"),
            LogicalExpression::Var(UnaryLogicalExpression::Comparison { op: CompareOp::NotIn, ref right, .. }) if right.len() == 3
        ));
        assert!(matches!(
            pred("o.name not like 'A%'"),
            LogicalExpression::Var(UnaryLogicalExpression::Comparison { op: CompareOp::NotLike, .. })
        ));
        assert!(matches!(
            pred("o.a IS NOT NULL"),
            LogicalExpression::Var(UnaryLogicalExpression::Comparison { op: CompareOp::IsNotNull, .. })
        ));
    }

    #[test]
    fn test_grouped_expression_left_operand() {
        assert!(matches!(
            pred("(o.a + 1) > 2"),
            LogicalExpression::Var(UnaryLogicalExpression::Comparison { left: Expression::Grouped(_), .. })
        ));
    }

    #[test]
    fn test_error_reports_line_and_column() {
        let input = "o.a =\n  = 1";
        let errs = pred_errors(input);
        assert!(errs.contains("Line 2"), "{errs}");
    }

    fn pred_errors(input: &str) -> String {
        let errs = logical(expression(set_stub(), Arithmetic::Operator), set_stub(), None)
            .then_ignore(end())
            .parse(input)
            .into_result()
            .unwrap_err();
        format_errors(&errs, input)
    }
}
