//! Query tree to surface text.
//!
//! The formatters are the inverse of the parsers in [`crate::syntax`]:
//! parsing the formatted text gives back a tree that renders the same SQL.

mod iql;
mod kql;

pub use iql::IqlFormatter;
pub use kql::KqlFormatter;

use crate::ast::{
    CompareOp, Exists, Expression, Function, Key, LogicalExpression, Query, Select, Set,
    UnaryLogicalExpression,
};
use crate::error::FormatError;
use crate::render::literal;
use crate::syntax::common::is_reserved;

/// Trait for writing a query tree in a surface language.
pub trait QueryFormatter: Send + Sync {
    /// Language name, matching the parser's syntax name
    fn name(&self) -> &'static str;

    fn format(&self, query: &Query) -> Result<String, FormatError>;
}

/// Formatter for a language name (`iql` or `kql`), ignoring case.
pub fn formatter(name: &str) -> Option<Box<dyn QueryFormatter>> {
    match name.to_ascii_lowercase().as_str() {
        "iql" => Some(Box::new(IqlFormatter)),
        "kql" => Some(Box::new(KqlFormatter)),
        _ => None,
    }
}

/// Identifier, double quoted when it would not lex as one.
pub(crate) fn ident(name: &str) -> String {
    if literal::is_plain(name) && !is_reserved(name) {
        name.to_string()
    } else {
        literal::quoted(name)
    }
}

/// Shared layout of both languages. Implementors supply the select form
/// and everything the grammars spell differently.
pub(crate) trait Surface {
    const LANGUAGE: &'static str;

    fn select(&self, select: &Select) -> Result<String, FormatError>;

    fn exists(&self, parent: Option<&str>, exists: &Exists) -> Result<String, FormatError>;

    fn function(&self, function: &Function) -> Result<String, FormatError> {
        let args = function
            .args
            .iter()
            .map(|a| self.expression(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{}({})", ident(&function.name), args.join(", ")))
    }

    fn unsupported(&self, feature: impl Into<String>) -> FormatError {
        FormatError::Unsupported {
            language: Self::LANGUAGE,
            feature: feature.into(),
        }
    }

    fn query(&self, query: &Query) -> Result<String, FormatError> {
        let mut lines: Vec<String> = query
            .description
            .iter()
            .flat_map(|d| d.lines())
            .map(|line| format!("// {line}"))
            .collect();

        let count = query.blocks.len();
        for (i, block) in query.blocks.iter().enumerate() {
            let head = if i == 0 { "WITH " } else { "     " };
            let tail = if i + 1 < count { ")," } else { ")" };
            lines.push(format!("{head}{} AS (", ident(&block.id)));
            lines.push(self.set(&block.set)?);
            lines.push(tail.to_string());
        }

        lines.push(self.set(&query.set)?);
        Ok(lines.join("\n"))
    }

    fn set(&self, set: &Set) -> Result<String, FormatError> {
        match set {
            Set::Select(select) => self.select(select),
            Set::Compound { op, left, right } => Ok(format!(
                "{}\n{}\n{}",
                self.operand(left)?,
                op.keyword(),
                self.operand(right)?
            )),
        }
    }

    fn operand(&self, set: &Set) -> Result<String, FormatError> {
        let text = self.set(set)?;
        Ok(match set {
            Set::Compound { .. } => format!("({text})"),
            Set::Select(_) => text,
        })
    }

    fn logical(&self, expr: &LogicalExpression) -> Result<String, FormatError> {
        match expr {
            LogicalExpression::Var(unary) => self.unary(unary),
            LogicalExpression::Not(inner) => Ok(format!("NOT ({})", self.logical(inner)?)),
            LogicalExpression::And(children) => Ok(children
                .iter()
                .map(|c| match c {
                    LogicalExpression::Or(_) => Ok(format!("({})", self.logical(c)?)),
                    _ => self.logical(c),
                })
                .collect::<Result<Vec<_>, FormatError>>()?
                .join(" AND ")),
            LogicalExpression::Or(children) => Ok(children
                .iter()
                .map(|c| self.logical(c))
                .collect::<Result<Vec<_>, _>>()?
                .join(" OR ")),
        }
    }

    fn unary(&self, unary: &UnaryLogicalExpression) -> Result<String, FormatError> {
        match unary {
            UnaryLogicalExpression::Nested(inner) => Ok(format!("({})", self.logical(inner)?)),
            UnaryLogicalExpression::Exists { parent, exists } => {
                self.exists(parent.as_deref(), exists)
            }
            UnaryLogicalExpression::Comparison { left, op, right } => {
                self.comparison(left, *op, right)
            }
        }
    }

    fn comparison(
        &self,
        left: &Expression,
        op: CompareOp,
        operands: &[Expression],
    ) -> Result<String, FormatError> {
        let left = self.expression(left)?;
        let right = operands
            .iter()
            .map(|e| self.expression(e))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match (op, right.as_slice()) {
            (CompareOp::IsNull | CompareOp::IsNotNull, []) => format!("{left} {op}"),
            (CompareOp::Between, [low, high]) => format!("{left} {op} {low} AND {high}"),
            (CompareOp::In | CompareOp::NotIn, [subquery])
                if matches!(operands, [Expression::Set(_)]) =>
            {
                format!("{left} {op} {subquery}")
            }
            (CompareOp::In | CompareOp::NotIn, items) if !items.is_empty() => {
                format!("{left} {op} ({})", items.join(", "))
            }
            (_, [value]) => format!("{left} {op} {value}"),
            _ => {
                return Err(self.unsupported(format!(
                    "{op} with {} operands",
                    operands.len()
                )))
            }
        })
    }

    fn expression(&self, expr: &Expression) -> Result<String, FormatError> {
        Ok(match expr {
            Expression::Set(set) => format!("({})", self.set(set)?),
            Expression::BinaryOp { op, left, right } => format!(
                "{} {} {}",
                self.expression(left)?,
                op.symbol(),
                self.expression(right)?
            ),
            Expression::Grouped(inner) => format!("({})", self.expression(inner)?),
            Expression::Column(column) => match &column.alias {
                Some(alias) => format!("{}.{}", ident(alias), ident(&column.name)),
                None => ident(&column.name),
            },
            Expression::Function(function) => self.function(function)?,
            Expression::Text(text) => literal::text(text),
            Expression::Number(value) => literal::number(*value),
            Expression::Date(value) => format!("DATE '{}'", literal::date(*value)),
            Expression::DateTime(value) => format!("TIMESTAMP '{}'", literal::timestamp(*value)),
            Expression::Time(value) => format!("TIME '{}'", literal::time(*value)),
            Expression::Identity(alias) => ident(alias),
        })
    }

    fn key(&self, key: &Key) -> Result<String, FormatError> {
        match key {
            Key::Expression(expression) => self.expression(expression),
            Key::Header(header) => Ok(format!("HEADER {}", ident(header))),
        }
    }
}
