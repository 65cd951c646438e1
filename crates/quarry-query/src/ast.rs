//! Language-neutral query tree
//!
//! Both surface languages build this tree, the rewrite passes reshape it and
//! the generators consume it. Ownership is strictly parent-to-child; code
//! that needs ancestor context gets it from [`crate::walker`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete query: named blocks followed by the query body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Common table expressions in declaration order.
    #[serde(default)]
    pub blocks: Vec<Block>,
    pub set: Set,
}

impl Query {
    pub fn new(set: Set) -> Self {
        Self {
            description: None,
            blocks: Vec::new(),
            set,
        }
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| quarry_catalog::ident::same(&b.id, id))
    }
}

/// A named sub-query usable as a table elsewhere in the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub set: Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Minus,
}

impl SetOperator {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::Minus => "MINUS",
        }
    }

    /// Standard SQL spelling; `MINUS` is `EXCEPT`.
    pub fn sql_keyword(self) -> &'static str {
        match self {
            Self::Minus => "EXCEPT",
            other => other.keyword(),
        }
    }
}

/// Query body: a single select or a set operation over two bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Set {
    Select(Box<Select>),
    Compound {
        op: SetOperator,
        left: Box<Set>,
        right: Box<Set>,
    },
}

impl Set {
    pub fn select(select: Select) -> Self {
        Self::Select(Box::new(select))
    }

    pub fn compound(op: SetOperator, left: Set, right: Set) -> Self {
        Self::Compound {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The start table of the left-most select.
    pub fn leading_table(&self) -> &Table {
        match self {
            Self::Select(select) => &select.start,
            Self::Compound { left, .. } => left.leading_table(),
        }
    }

    pub fn leading_table_mut(&mut self) -> &mut Table {
        match self {
            Self::Select(select) => &mut select.start,
            Self::Compound { left, .. } => left.leading_table_mut(),
        }
    }
}

/// One `SELECT`: a join tree rooted at `start` plus select-scoped clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub start: Table,
    #[serde(default)]
    pub joins: Vec<Join>,
    /// Select-scoped predicate (the "all-filter").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<LogicalExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<LogicalExpression>,
    /// Row limit, 0 for none.
    #[serde(default)]
    pub limit: u32,
}

impl Select {
    pub fn new(start: Table) -> Self {
        Self {
            start,
            joins: Vec::new(),
            filter: None,
            having: None,
            limit: 0,
        }
    }

    /// All tables of the join tree, start first, depth first.
    pub fn tables(&self) -> Vec<&Table> {
        fn collect<'a>(joins: &'a [Join], out: &mut Vec<&'a Table>) {
            for join in joins {
                out.push(&join.table);
                collect(&join.joins, out);
            }
        }
        let mut tables = vec![&self.start];
        collect(&self.joins, &mut tables);
        tables
    }

    /// Mutable access to a join-tree table by alias.
    pub fn table_mut(&mut self, alias: &str) -> Option<&mut Table> {
        fn find<'a>(joins: &'a mut [Join], alias: &str) -> Option<&'a mut Table> {
            for join in joins {
                if join.table.has_alias(alias) {
                    return Some(&mut join.table);
                }
                if let Some(table) = find(&mut join.joins, alias) {
                    return Some(table);
                }
            }
            None
        }
        if self.start.has_alias(alias) {
            return Some(&mut self.start);
        }
        find(&mut self.joins, alias)
    }
}

/// A table reference with its table-local clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub out: Vec<Out>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<LogicalExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<LogicalExpression>,
    #[serde(default)]
    pub group: Vec<Group>,
    #[serde(default)]
    pub order: Vec<Order>,
}

impl Table {
    pub fn new(name: impl Into<String>, alias: Option<&str>) -> Self {
        Self {
            name: name.into(),
            alias: alias.map(str::to_string),
            out: Vec::new(),
            filter: None,
            having: None,
            group: Vec::new(),
            order: Vec::new(),
        }
    }

    /// True when columns qualified with `alias` belong to this table. A table
    /// without an alias is qualified by its name.
    pub fn has_alias(&self, alias: &str) -> bool {
        quarry_catalog::ident::same(self.qualifier(), alias)
    }

    /// The alias, or the table name when there is none.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A join edge from the enclosing table to `table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Relation or link name, `None` to match on tables only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// `LEFT OUTER JOIN` when set, `INNER JOIN` otherwise.
    #[serde(default)]
    pub optional: bool,
    /// The relation runs from `table` back to the enclosing table.
    #[serde(default)]
    pub invers: bool,
    pub table: Table,
    #[serde(default)]
    pub joins: Vec<Join>,
}

impl Join {
    pub fn new(crit: Option<&str>, table: Table) -> Self {
        Self {
            crit: crit.map(str::to_string),
            reference: None,
            optional: false,
            invers: false,
            table,
            joins: Vec::new(),
        }
    }
}

/// A correlated existence test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exists {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<String>,
    #[serde(default)]
    pub invers: bool,
    pub table: Table,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub joins: Vec<Join>,
}

/// A projected expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Out {
    pub expression: Expression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Explicit 1-based output position, 0 for natural order.
    #[serde(default)]
    pub idx: u32,
}

impl Out {
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            header: None,
            idx: 0,
        }
    }
}

/// Target of a `GROUP BY` or `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Key {
    Expression(Expression),
    /// Reference to an output header.
    Header(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub key: Key,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub key: Key,
    pub asc: bool,
}

/// Boolean formula.
///
/// After [`crate::normalize`] no `And` directly contains an `And`, no `Or`
/// an `Or` and no `Not` a `Not`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalExpression {
    Var(UnaryLogicalExpression),
    Not(Box<LogicalExpression>),
    And(Vec<LogicalExpression>),
    Or(Vec<LogicalExpression>),
}

impl LogicalExpression {
    pub fn comparison(left: Expression, op: CompareOp, right: Vec<Expression>) -> Self {
        Self::Var(UnaryLogicalExpression::Comparison { left, op, right })
    }

    /// AND of `parts`: `None` when empty, the part itself when single.
    pub fn all(mut parts: Vec<LogicalExpression>) -> Option<Self> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Self::And(parts)),
        }
    }

    /// AND-combine two optional predicates, flattening the result.
    pub fn conjoin(first: Option<Self>, second: Option<Self>) -> Option<Self> {
        match (first, second) {
            (None, other) | (other, None) => other,
            (Some(a), Some(b)) => crate::normalize::normalize(Some(Self::And(vec![a, b]))),
        }
    }
}

/// Leaf of a boolean formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnaryLogicalExpression {
    /// A parenthesised sub-formula.
    Nested(Box<LogicalExpression>),
    Exists {
        /// Alias of the table the existence test correlates with.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<String>,
        exists: Box<Exists>,
    },
    Comparison {
        left: Expression,
        op: CompareOp,
        /// Empty for `IS NULL`, two values for `BETWEEN`, one or more for `IN`.
        right: Vec<Expression>,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Between => "BETWEEN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// Whether `count` right-hand operands fit this operator.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::IsNull | Self::IsNotNull => count == 0,
            Self::Between => count == 2,
            Self::In | Self::NotIn => count >= 1,
            _ => count == 1,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// Scalar expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Scalar or row subquery.
    Set(Box<Set>),
    BinaryOp {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Grouped(Box<Expression>),
    Column(Column),
    Function(Function),
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    /// Primary key of the table known by this alias, resolved by the rewrite pipeline.
    Identity(String),
}

impl Expression {
    pub fn column(alias: Option<&str>, name: impl Into<String>) -> Self {
        Self::Column(Column {
            alias: alias.map(str::to_string),
            name: name.into(),
        })
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self::Function(Function {
            name: name.into(),
            args,
        })
    }

    pub fn binary(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
        Self::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Text(_) | Self::Number(_) | Self::Date(_) | Self::DateTime(_) | Self::Time(_)
        )
    }

    /// True for a call to one of the SQL aggregate functions.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Self::Function(function) => crate::functions::is_aggregate(&function.name),
            _ => false,
        }
    }

    /// True if an aggregate call appears anywhere outside nested subqueries.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Function(function) => {
                crate::functions::is_aggregate(&function.name)
                    || function.args.iter().any(Expression::contains_aggregate)
            }
            Self::BinaryOp { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Self::Grouped(inner) => inner.contains_aggregate(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expression>,
}
