//! Entity language formatter. Every tree shape has an IQL spelling.

use crate::ast::{Exists, Join, Query, Select, Table};
use crate::error::FormatError;
use crate::format::{ident, QueryFormatter, Surface};

const INDENT: &str = "  ";

/// Writes queries in the entity language
pub struct IqlFormatter;

impl QueryFormatter for IqlFormatter {
    fn name(&self) -> &'static str {
        "iql"
    }

    fn format(&self, query: &Query) -> Result<String, FormatError> {
        self.query(query)
    }
}

impl Surface for IqlFormatter {
    const LANGUAGE: &'static str = "IQL";

    fn select(&self, select: &Select) -> Result<String, FormatError> {
        let mut text = format!("SELECT {}", self.entity(&select.start, 0)?);
        self.joins(&select.joins, 0, &mut text)?;

        if select.filter.is_some() || select.having.is_some() {
            text.push_str("\nALL");
            if let Some(filter) = &select.filter {
                text.push_str(&format!(" FILTER {}", self.logical(filter)?));
            }
            if let Some(having) = &select.having {
                text.push_str(&format!(" HAVING {}", self.logical(having)?));
            }
        }
        if select.limit > 0 {
            text.push_str(&format!("\nLIMIT {}", select.limit));
        }
        Ok(text)
    }

    fn exists(&self, parent: Option<&str>, exists: &Exists) -> Result<String, FormatError> {
        let mut text = String::from("EXISTS ");
        if let Some(parent) = parent {
            text.push_str(&format!("ON {} ", ident(parent)));
        }
        text.push('(');
        if exists.invers {
            text.push_str("INVERS ");
        }
        text.push_str(&crit(exists.crit.as_deref()));
        text.push(' ');
        text.push_str(&self.entity(&exists.table, 1)?);
        self.joins(&exists.joins, 1, &mut text)?;
        text.push(')');
        if let Some(alias) = &exists.alias {
            text.push_str(&format!(" AS {}", ident(alias)));
        }
        Ok(text)
    }
}

fn crit(crit: Option<&str>) -> String {
    crit.map_or_else(|| "ANY".to_string(), ident)
}

impl IqlFormatter {
    /// `table [alias]` followed by its clauses, one per line.
    fn entity(&self, table: &Table, depth: usize) -> Result<String, FormatError> {
        let mut text = ident(&table.name);
        if let Some(alias) = &table.alias {
            text.push(' ');
            text.push_str(&ident(alias));
        }

        let pad = INDENT.repeat(depth + 1);
        let mut clause = |body: String| {
            text.push('\n');
            text.push_str(&pad);
            text.push_str(&body);
        };

        for out in &table.out {
            let mut body = format!("OUT {}", self.expression(&out.expression)?);
            if let Some(header) = &out.header {
                body.push(' ');
                body.push_str(&ident(header));
            }
            if out.idx > 0 {
                body.push_str(&format!(" {}", out.idx));
            }
            clause(body);
        }
        if let Some(filter) = &table.filter {
            clause(format!("FILTER {}", self.logical(filter)?));
        }
        if let Some(having) = &table.having {
            clause(format!("HAVING {}", self.logical(having)?));
        }
        for group in &table.group {
            clause(format!("GROUP {}", self.key(&group.key)?));
        }
        for order in &table.order {
            let direction = if order.asc { "" } else { " DESC" };
            clause(format!("ORDER {}{direction}", self.key(&order.key)?));
        }
        Ok(text)
    }

    fn joins(&self, joins: &[Join], depth: usize, text: &mut String) -> Result<(), FormatError> {
        let pad = INDENT.repeat(depth);
        for join in joins {
            text.push_str(&format!("\n{pad}JOIN "));
            if join.optional {
                text.push_str("OPTIONAL ");
            }
            if join.invers {
                text.push_str("INVERS ");
            }
            text.push_str(&crit(join.crit.as_deref()));
            if let Some(reference) = &join.reference {
                text.push_str(&format!(" REF {}", ident(reference)));
            }
            text.push(' ');
            text.push_str(&self.entity(&join.table, depth + 1)?);
            self.joins(&join.joins, depth + 1, text)?;
            text.push_str(&format!("\n{pad}OWNER"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, Expression, LogicalExpression, Out, Set};
    use crate::syntax::{IqlSyntax, QuerySyntax};

    fn round_trip(input: &str) {
        let parsed = IqlSyntax.parse(input).unwrap();
        let text = IqlFormatter.format(&parsed).unwrap();
        let reparsed = IqlSyntax
            .parse(&text)
            .unwrap_or_else(|e| panic!("formatted text did not parse: {e}\n{text}"));
        assert_eq!(parsed, reparsed, "\n{text}");
    }

    #[test]
    fn test_simple_select_layout() {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(Expression::column(Some("o"), "id")));
        start.filter = Some(LogicalExpression::comparison(
            Expression::column(Some("o"), "amount"),
            CompareOp::Gt,
            vec![Expression::Number(10.0)],
        ));
        let mut select = Select::new(start);
        select.limit = 3;

        let text = IqlFormatter.format(&Query::new(Set::select(select))).unwrap();
        assert_eq!(
            text,
            "SELECT orders o\n  OUT o.id\n  FILTER o.amount > 10\nLIMIT 3"
        );
    }

    #[test]
    fn test_round_trip_joins_and_clauses() {
        round_trip(
            "SELECT orders o OUT o.id OUT sum(o.amount) total 2 GROUP o.id ORDER HEADER total DESC \
             JOIN OPTIONAL placed customers c OUT c.name \
               JOIN INVERS ANY REF filed complaints k OWNER \
             OWNER \
             ALL FILTER o.amount > 1 OR c.name LIKE 'A''s%' HAVING count(o) > 2 \
             LIMIT 10",
        );
    }

    #[test]
    fn test_round_trip_predicates_and_literals() {
        round_trip(
            "SELECT orders o \
             FILTER (o.a = 1 OR o.b <> 2) AND NOT (o.c IS NULL) \
             FILTER o.d BETWEEN DATE '2024-01-01' AND DATE '2024-12-31' \
             FILTER o.e NOT IN (1, 2.5, -3) AND o.f >= TIMESTAMP '2024-01-01 10:30:00' \
             FILTER o.g IN (SELECT archive a OUT a.id) \
             FILTER EXISTS ON o (INVERS placed customers c FILTER c.vip = 1) AS e",
        );
    }

    #[test]
    fn test_round_trip_blocks_sets_and_description() {
        round_trip(
            "// nightly\n// export\n\
             WITH big AS (SELECT orders o FILTER o.amount > 100), \"select\" AS (SELECT archive a) \
             SELECT big b UNION (SELECT \"select\" s MINUS SELECT archive x)",
        );
    }

    #[test]
    fn test_reserved_names_are_quoted() {
        let query = Query::new(Set::select(Select::new(Table::new("order", Some("Group")))));
        assert_eq!(
            IqlFormatter.format(&query).unwrap(),
            "SELECT \"order\" \"Group\""
        );
    }
}
