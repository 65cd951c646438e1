//! Link language formatter.
//!
//! The link language keeps outputs and ordering on the start table and all
//! filtering in one `WHERE`, so trees that use table-local clauses on joined
//! tables, `EXISTS`, select-level `HAVING` or `REF` cannot be written.

use crate::ast::{Exists, Expression, Function, Join, Out, Query, Select, Table};
use crate::error::FormatError;
use crate::format::{ident, QueryFormatter, Surface};
use crate::functions;

/// Writes queries in the link language
pub struct KqlFormatter;

impl QueryFormatter for KqlFormatter {
    fn name(&self) -> &'static str {
        "kql"
    }

    fn format(&self, query: &Query) -> Result<String, FormatError> {
        self.query(query)
    }
}

impl Surface for KqlFormatter {
    const LANGUAGE: &'static str = "KQL";

    fn select(&self, select: &Select) -> Result<String, FormatError> {
        let start = &select.start;
        if start.filter.is_some() || start.having.is_some() || !start.group.is_empty() {
            return Err(self.unsupported(format!(
                "filter, having or group clauses on table '{}'",
                start.qualifier()
            )));
        }
        if select.having.is_some() {
            return Err(self.unsupported("select-level HAVING"));
        }

        let mut items = vec![format!("FIND {} {}", ident(&start.name), self.alias(start)?)];
        self.links(start, &select.joins, &mut items)?;
        let mut text = items.join(", ");

        if let Some(filter) = &select.filter {
            text.push_str(&format!("\nWHERE {}", self.logical(filter)?));
        }

        if !start.out.is_empty() {
            let mut outs: Vec<&Out> = start.out.iter().collect();
            outs.sort_by_key(|out| if out.idx == 0 { u32::MAX } else { out.idx });
            let returns = outs
                .into_iter()
                .map(|out| {
                    let expression = self.expression(&out.expression)?;
                    Ok(match &out.header {
                        Some(header) => format!("{expression} {}", ident(header)),
                        None => expression,
                    })
                })
                .collect::<Result<Vec<_>, FormatError>>()?;
            text.push_str(&format!("\nRETURN {}", returns.join(", ")));
        }

        if !start.order.is_empty() {
            let keys = start
                .order
                .iter()
                .map(|order| {
                    let direction = if order.asc { "" } else { " DESC" };
                    Ok(format!("{}{direction}", self.key(&order.key)?))
                })
                .collect::<Result<Vec<_>, FormatError>>()?;
            text.push_str(&format!("\nORDER {}", keys.join(", ")));
        }

        if select.limit > 0 {
            text.push_str(&format!("\nLIMIT {}", select.limit));
        }
        Ok(text)
    }

    fn exists(&self, _parent: Option<&str>, _exists: &Exists) -> Result<String, FormatError> {
        Err(self.unsupported("EXISTS"))
    }

    /// Arithmetic calls go back to infix, nested ones parenthesised.
    fn function(&self, function: &Function) -> Result<String, FormatError> {
        let Some(op) = functions::arithmetic(&function.name) else {
            let args = function
                .args
                .iter()
                .map(|a| self.expression(a))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(format!("{}({})", ident(&function.name), args.join(", ")));
        };
        if function.args.len() < 2 {
            return Err(self.unsupported(format!(
                "'{}' with {} operand(s)",
                function.name,
                function.args.len()
            )));
        }
        let args = function
            .args
            .iter()
            .map(|a| {
                let text = self.expression(a)?;
                Ok(match a {
                    Expression::Function(inner)
                        if functions::arithmetic(&inner.name).is_some() =>
                    {
                        format!("({text})")
                    }
                    Expression::BinaryOp { .. } => format!("({text})"),
                    _ => text,
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;
        Ok(args.join(&format!(" {} ", op.symbol())))
    }
}

impl KqlFormatter {
    fn alias(&self, table: &Table) -> Result<String, FormatError> {
        table
            .alias
            .as_deref()
            .map(ident)
            .ok_or_else(|| self.unsupported(format!("table '{}' without alias", table.name)))
    }

    /// One `from-crit->table alias` item per join, depth first.
    fn links(&self, from: &Table, joins: &[Join], items: &mut Vec<String>) -> Result<(), FormatError> {
        let source = self.alias(from)?;
        for join in joins {
            let table = &join.table;
            if join.reference.is_some() {
                return Err(self.unsupported("REF"));
            }
            if !table.out.is_empty()
                || table.filter.is_some()
                || table.having.is_some()
                || !table.group.is_empty()
                || !table.order.is_empty()
            {
                return Err(self.unsupported(format!(
                    "clauses on joined table '{}'",
                    table.qualifier()
                )));
            }

            let invers = if join.invers { "<" } else { "" };
            let crit = join.crit.as_deref().map(ident).unwrap_or_default();
            let kind = if join.optional { "+" } else { "-" };
            items.push(format!(
                "{source}{invers}-{crit}{kind}>{} {}",
                ident(&table.name),
                self.alias(table)?
            ));
            self.links(table, &join.joins, items)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Exists as ExistsNode, LogicalExpression, Set, UnaryLogicalExpression};
    use crate::syntax::{KqlSyntax, QuerySyntax};

    fn round_trip(input: &str) -> String {
        let parsed = KqlSyntax.parse(input).unwrap();
        let text = KqlFormatter.format(&parsed).unwrap();
        let reparsed = KqlSyntax
            .parse(&text)
            .unwrap_or_else(|e| panic!("formatted text did not parse: {e}\n{text}"));
        assert_eq!(parsed, reparsed, "\n{text}");
        text
    }

    #[test]
    fn test_links_layout() {
        let text = round_trip(
            "FIND orders o, o-placed->customers c, c<-filed+>complaints k, o-->items i",
        );
        assert_eq!(
            text,
            "FIND orders o, o-placed->customers c, c<-filed+>complaints k, o-->items i"
        );
    }

    #[test]
    fn test_round_trip_clauses() {
        round_trip(
            "FIND orders o, o-placed->customers c \
             WHERE o.amount * 2 > 100 AND (c.name LIKE 'A%' OR c.name IS NULL) \
             RETURN o.id, c.name customer, (o.net + o.tax) * 2 gross \
             ORDER HEADER customer DESC, o.id \
             LIMIT 5",
        );
    }

    #[test]
    fn test_round_trip_set_operations() {
        round_trip("WITH x AS (FIND orders o RETURN o.id) FIND x a UNION ALL FIND archive b");
    }

    #[test]
    fn test_joined_table_clauses_are_unsupported() {
        let mut select = Select::new(Table::new("orders", Some("o")));
        let mut customers = Table::new("customers", Some("c"));
        customers.out.push(Out::new(Expression::column(Some("c"), "name")));
        select.joins.push(Join::new(Some("placed"), customers));

        let err = KqlFormatter
            .format(&Query::new(Set::select(select)))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "KQL cannot express clauses on joined table 'c'"
        );
    }

    #[test]
    fn test_exists_is_unsupported() {
        let mut select = Select::new(Table::new("customers", Some("c")));
        select.filter = Some(LogicalExpression::Var(UnaryLogicalExpression::Exists {
            parent: None,
            exists: Box::new(ExistsNode {
                crit: None,
                invers: false,
                table: Table::new("orders", Some("o")),
                alias: None,
                joins: Vec::new(),
            }),
        }));
        let err = KqlFormatter
            .format(&Query::new(Set::select(select)))
            .unwrap_err();
        assert!(matches!(err, FormatError::Unsupported { feature, .. } if feature == "EXISTS"));
    }

    #[test]
    fn test_missing_alias_is_unsupported() {
        let query = Query::new(Set::select(Select::new(Table::new("orders", None))));
        assert!(KqlFormatter.format(&query).is_err());
    }
}
