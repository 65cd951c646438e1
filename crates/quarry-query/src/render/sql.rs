//! SQL text generation.
//!
//! Layout is one clause per line. Blocks are indented inside `WITH id AS (`,
//! subqueries and `EXISTS` bodies are written on a single line.

use quarry_catalog::ident;
use quarry_config::IdentifierStyle;
use tracing::debug;

use crate::ast::*;
use crate::error::RenderError;
use crate::functions;
use crate::render::{literal, AnsiDialect, Dialect, JdbcDialect, QueryRenderer};
use crate::resolver::{RelationResolver, ResolverConfig};
use crate::transform::catalog_table;
use crate::walker;

const INDENT: &str = "  ";

/// Renders queries as SQL, temporal literals spelled by `D`.
pub struct SqlGenerator<D = AnsiDialect> {
    resolver: RelationResolver,
    config: ResolverConfig,
    identifiers: IdentifierStyle,
    dialect: D,
}

impl SqlGenerator<AnsiDialect> {
    pub fn ansi(resolver: RelationResolver) -> Self {
        Self::new(resolver, AnsiDialect)
    }
}

impl SqlGenerator<JdbcDialect> {
    pub fn jdbc(resolver: RelationResolver) -> Self {
        Self::new(resolver, JdbcDialect)
    }
}

impl<D: Dialect> SqlGenerator<D> {
    pub fn new(resolver: RelationResolver, dialect: D) -> Self {
        Self {
            resolver,
            config: ResolverConfig::default(),
            identifiers: IdentifierStyle::default(),
            dialect,
        }
    }

    /// Resolver flags used for join predicates.
    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_identifiers(mut self, identifiers: IdentifierStyle) -> Self {
        self.identifiers = identifiers;
        self
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn to_sql(&self, query: &Query) -> Result<String, RenderError> {
        let writer = Writer {
            generator: self,
            query,
        };
        let lines = writer.query()?;
        debug!(dialect = self.dialect.name(), lines = lines.len(), "rendered SQL");
        Ok(lines.join("\n"))
    }
}

impl<D: Dialect> QueryRenderer for SqlGenerator<D> {
    fn name(&self) -> &str {
        self.dialect.name()
    }

    fn render(&self, query: &Query) -> Result<String, RenderError> {
        self.to_sql(query)
    }
}

/// Predicates collected while walking a join tree, each with the table that
/// owns it (the correlation target of an `EXISTS` without `ON`).
#[derive(Default)]
struct Clauses<'q> {
    joins: Vec<String>,
    filters: Vec<(&'q Table, &'q LogicalExpression)>,
    havings: Vec<(&'q Table, &'q LogicalExpression)>,
}

#[derive(Clone, Copy)]
struct Scope<'q> {
    select: &'q Select,
    owner: &'q Table,
}

struct Writer<'g, 'q, D> {
    generator: &'g SqlGenerator<D>,
    query: &'q Query,
}

impl<'q, D: Dialect> Writer<'_, 'q, D> {
    fn query(&self) -> Result<Vec<String>, RenderError> {
        let mut lines: Vec<String> = self
            .query
            .description
            .iter()
            .flat_map(|d| d.lines())
            .map(|line| format!("-- {line}"))
            .collect();

        let count = self.query.blocks.len();
        for (i, block) in self.query.blocks.iter().enumerate() {
            let head = if i == 0 { "WITH " } else { "" };
            lines.push(format!("{head}{} AS (", self.ident(&block.id)));
            lines.extend(indented(self.set(&block.set)?));
            lines.push(if i + 1 == count { ")" } else { ")," }.to_string());
        }

        lines.extend(self.set(&self.query.set)?);
        Ok(lines)
    }

    fn set(&self, set: &'q Set) -> Result<Vec<String>, RenderError> {
        match set {
            Set::Select(select) => self.select(select),
            Set::Compound { op, left, right } => {
                let mut lines = self.operand(left)?;
                lines.push(op.sql_keyword().to_string());
                lines.extend(self.operand(right)?);
                Ok(lines)
            }
        }
    }

    /// A set-operation child, parenthesised when it would not stand alone.
    fn operand(&self, set: &'q Set) -> Result<Vec<String>, RenderError> {
        let lines = self.set(set)?;
        let wrap = match set {
            Set::Select(select) => select.limit > 0 || select.tables().iter().any(|t| !t.order.is_empty()),
            Set::Compound { .. } => true,
        };
        if !wrap {
            return Ok(lines);
        }
        let mut wrapped = vec!["(".to_string()];
        wrapped.extend(indented(lines));
        wrapped.push(")".to_string());
        Ok(wrapped)
    }

    fn select(&self, select: &'q Select) -> Result<Vec<String>, RenderError> {
        let start = &select.start;
        let scope = Scope {
            select,
            owner: start,
        };

        let mut clauses = Clauses::default();
        clauses.filters.extend(start.filter.as_ref().map(|f| (start, f)));
        clauses.havings.extend(start.having.as_ref().map(|h| (start, h)));
        self.joins(scope, start, &select.joins, false, &mut clauses)?;
        clauses.filters.extend(select.filter.as_ref().map(|f| (start, f)));
        clauses.havings.extend(select.having.as_ref().map(|h| (start, h)));

        let tables = select.tables();
        let mut lines = vec![
            format!("SELECT {}", self.outs(&tables)?),
            format!("FROM {}", self.table_ref(start)),
        ];
        lines.append(&mut clauses.joins);
        if let Some(filter) = self.conjunction(select, &clauses.filters)? {
            lines.push(format!("WHERE {filter}"));
        }
        lines.extend(self.tail(select, &tables, &clauses.havings)?);
        if select.limit > 0 {
            lines.push(format!("FETCH FIRST {} ROWS ONLY", select.limit));
        }
        Ok(lines)
    }

    /// `GROUP BY`, `HAVING` and `ORDER BY` lines.
    fn tail(
        &self,
        select: &'q Select,
        tables: &[&'q Table],
        havings: &[(&'q Table, &'q LogicalExpression)],
    ) -> Result<Vec<String>, RenderError> {
        let mut lines = Vec::new();

        let groups = tables
            .iter()
            .copied()
            .flat_map(|t| &t.group)
            .map(|g| self.key(&g.key))
            .collect::<Result<Vec<_>, _>>()?;
        if !groups.is_empty() {
            lines.push(format!("GROUP BY {}", groups.join(", ")));
        }

        if let Some(having) = self.conjunction(select, havings)? {
            lines.push(format!("HAVING {having}"));
        }

        let orders = tables
            .iter()
            .copied()
            .flat_map(|t| &t.order)
            .map(|o| {
                let direction = if o.asc { "ASC" } else { "DESC" };
                Ok(format!("{} {direction}", self.key(&o.key)?))
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        if !orders.is_empty() {
            lines.push(format!("ORDER BY {}", orders.join(", ")));
        }

        Ok(lines)
    }

    fn joins(
        &self,
        scope: Scope<'q>,
        left: &'q Table,
        joins: &'q [Join],
        below_optional: bool,
        clauses: &mut Clauses<'q>,
    ) -> Result<(), RenderError> {
        for join in joins {
            let table = &join.table;
            let outer = below_optional || join.optional;
            let mut on = self.edge(left, table, join.crit.as_deref(), join.invers)?;

            if outer {
                if table.having.is_some() {
                    return Err(RenderError::structural(format!(
                        "HAVING on outer joined table '{}'",
                        table.qualifier()
                    )));
                }
                if let Some(filter) = &table.filter {
                    let owned = Scope {
                        select: scope.select,
                        owner: table,
                    };
                    on.push(self.conjunct(owned, filter)?);
                }
            } else {
                clauses.filters.extend(table.filter.as_ref().map(|f| (table, f)));
                clauses.havings.extend(table.having.as_ref().map(|h| (table, h)));
            }

            let kind = if join.optional {
                "LEFT OUTER JOIN"
            } else {
                "INNER JOIN"
            };
            clauses
                .joins
                .push(format!("{kind} {} ON {}", self.table_ref(table), on.join(" AND ")));
            self.joins(scope, table, &join.joins, outer, clauses)?;
        }
        Ok(())
    }

    /// Equality terms joining `left` to `right`.
    fn edge(
        &self,
        left: &'q Table,
        right: &'q Table,
        crit: Option<&str>,
        invers: bool,
    ) -> Result<Vec<String>, RenderError> {
        let (start, end) = if invers { (right, left) } else { (left, right) };
        let resolver = &self.generator.resolver;
        let start_table = catalog_table(resolver, self.query, &start.name)?;
        let end_table = catalog_table(resolver, self.query, &end.name)?;
        let resolved = resolver.find(start_table, end_table, crit, self.generator.config)?;

        let start_q = self.ident(start.qualifier());
        let end_q = self.ident(end.qualifier());
        Ok(resolved
            .pairs()
            .into_iter()
            .map(|(s, e)| format!("{start_q}.{} = {end_q}.{}", self.ident(s), self.ident(e)))
            .collect())
    }

    fn outs(&self, tables: &[&'q Table]) -> Result<String, RenderError> {
        let mut outs: Vec<&'q Out> = tables.iter().copied().flat_map(|t| &t.out).collect();
        if outs.is_empty() {
            return Ok("*".to_string());
        }
        outs.sort_by_key(|out| if out.idx == 0 { u32::MAX } else { out.idx });

        let items = outs
            .into_iter()
            .map(|out| {
                let expression = self.expression(&out.expression)?;
                Ok(match &out.header {
                    Some(header) => format!("{expression} AS {}", self.ident(header)),
                    None => expression,
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        Ok(items.join(", "))
    }

    fn key(&self, key: &'q Key) -> Result<String, RenderError> {
        match key {
            Key::Expression(expression) => self.expression(expression),
            Key::Header(header) => Ok(self.ident(header)),
        }
    }

    /// AND of predicates owned by different tables of `select`.
    fn conjunction(
        &self,
        select: &'q Select,
        parts: &[(&'q Table, &'q LogicalExpression)],
    ) -> Result<Option<String>, RenderError> {
        if parts.is_empty() {
            return Ok(None);
        }
        let rendered = parts
            .iter()
            .map(|&(owner, expr)| self.conjunct(Scope { select, owner }, expr))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(rendered.join(" AND ")))
    }

    /// A predicate used as one operand of AND.
    fn conjunct(&self, scope: Scope<'q>, expr: &'q LogicalExpression) -> Result<String, RenderError> {
        let text = self.logical(scope, expr)?;
        Ok(match expr {
            LogicalExpression::Or(_) => format!("({text})"),
            _ => text,
        })
    }

    fn logical(&self, scope: Scope<'q>, expr: &'q LogicalExpression) -> Result<String, RenderError> {
        match expr {
            LogicalExpression::Var(unary) => self.unary(scope, unary),
            LogicalExpression::Not(inner) => Ok(format!("NOT ({})", self.logical(scope, inner)?)),
            LogicalExpression::And(children) => Ok(children
                .iter()
                .map(|c| self.conjunct(scope, c))
                .collect::<Result<Vec<_>, _>>()?
                .join(" AND ")),
            LogicalExpression::Or(children) => Ok(children
                .iter()
                .map(|c| self.logical(scope, c))
                .collect::<Result<Vec<_>, _>>()?
                .join(" OR ")),
        }
    }

    fn unary(&self, scope: Scope<'q>, unary: &'q UnaryLogicalExpression) -> Result<String, RenderError> {
        match unary {
            UnaryLogicalExpression::Nested(inner) => Ok(format!("({})", self.logical(scope, inner)?)),
            UnaryLogicalExpression::Exists { parent, exists } => {
                self.exists(scope, parent.as_deref(), exists)
            }
            UnaryLogicalExpression::Comparison { left, op, right } => {
                self.comparison(left, *op, right)
            }
        }
    }

    fn comparison(
        &self,
        left: &'q Expression,
        op: CompareOp,
        operands: &'q [Expression],
    ) -> Result<String, RenderError> {
        if !op.accepts(operands.len()) {
            return Err(RenderError::structural(format!(
                "{op} does not take {} operands",
                operands.len()
            )));
        }
        let left = self.expression(left)?;
        let right = operands
            .iter()
            .map(|e| self.expression(e))
            .collect::<Result<Vec<_>, _>>()?;

        match (op, right.as_slice()) {
            (CompareOp::IsNull | CompareOp::IsNotNull, []) => Ok(format!("{left} {op}")),
            (CompareOp::Between, [low, high]) => Ok(format!("{left} {op} {low} AND {high}")),
            (CompareOp::In | CompareOp::NotIn, [subquery])
                if matches!(operands, [Expression::Set(_)]) =>
            {
                Ok(format!("{left} {op} {subquery}"))
            }
            (CompareOp::In | CompareOp::NotIn, items) => {
                Ok(format!("{left} {op} ({})", items.join(", ")))
            }
            (_, [value]) => Ok(format!("{left} {op} {value}")),
            _ => Err(RenderError::structural(format!("malformed {op} comparison"))),
        }
    }

    fn exists(
        &self,
        scope: Scope<'q>,
        parent: Option<&str>,
        exists: &'q Exists,
    ) -> Result<String, RenderError> {
        let left = match parent {
            Some(alias) => walker::find_table(scope.select, alias).ok_or_else(|| {
                RenderError::structural(format!("EXISTS correlates with unknown alias '{alias}'"))
            })?,
            None => scope.owner,
        };
        let table = &exists.table;
        let inner = Scope {
            select: scope.select,
            owner: table,
        };

        let mut clauses = Clauses::default();
        clauses.filters.extend(table.filter.as_ref().map(|f| (table, f)));
        clauses.havings.extend(table.having.as_ref().map(|h| (table, h)));
        self.joins(inner, table, &exists.joins, false, &mut clauses)?;

        let mut conditions = self.edge(left, table, exists.crit.as_deref(), exists.invers)?;
        if let Some(filter) = self.conjunction(scope.select, &clauses.filters)? {
            conditions.push(filter);
        }

        let mut tables = vec![table];
        collect_tables(&exists.joins, &mut tables);

        let mut parts = vec![format!("SELECT 1 FROM {}", self.table_ref(table))];
        parts.append(&mut clauses.joins);
        parts.push(format!("WHERE {}", conditions.join(" AND ")));
        parts.extend(self.tail(scope.select, &tables, &clauses.havings)?);
        Ok(format!("EXISTS ({})", parts.join(" ")))
    }

    fn expression(&self, expr: &'q Expression) -> Result<String, RenderError> {
        let dialect = &self.generator.dialect;
        Ok(match expr {
            Expression::Set(set) => format!("({})", self.set(set)?.join(" ")),
            Expression::BinaryOp { op, left, right } => format!(
                "{} {} {}",
                self.expression(left)?,
                op.symbol(),
                self.expression(right)?
            ),
            Expression::Grouped(inner) => format!("({})", self.expression(inner)?),
            Expression::Column(column) => self.column(column),
            Expression::Function(function) => self.function(function)?,
            Expression::Text(text) => literal::text(text),
            Expression::Number(value) => literal::number(*value),
            Expression::Date(value) => dialect.date(*value),
            Expression::DateTime(value) => dialect.timestamp(*value),
            Expression::Time(value) => dialect.time(*value),
            Expression::Identity(alias) => {
                return Err(RenderError::structural(format!(
                    "identity reference '{alias}' was never resolved"
                )))
            }
        })
    }

    fn function(&self, function: &'q Function) -> Result<String, RenderError> {
        let infix = functions::arithmetic(&function.name);
        let args = function
            .args
            .iter()
            .map(|a| {
                let rendered = self.expression(a)?;
                // nested arithmetic calls carry no Grouped node of their own
                Ok(if infix.is_some() && is_arithmetic(a) {
                    format!("({rendered})")
                } else {
                    rendered
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        match infix {
            Some(op) if args.len() >= 2 => Ok(args.join(&format!(" {} ", op.symbol()))),
            Some(_) => Err(RenderError::structural(format!(
                "'{}' needs at least two operands",
                function.name
            ))),
            None => Ok(format!("{}({})", function.name, args.join(", "))),
        }
    }

    fn column(&self, column: &Column) -> String {
        match &column.alias {
            Some(alias) => format!("{}.{}", self.ident(alias), self.ident(&column.name)),
            None => self.ident(&column.name),
        }
    }

    fn table_ref(&self, table: &Table) -> String {
        match &table.alias {
            Some(alias) => format!("{} {}", self.ident(&table.name), self.ident(alias)),
            None => self.ident(&table.name),
        }
    }

    fn ident(&self, name: &str) -> String {
        let name = ident::unquote(name);
        match self.generator.identifiers {
            IdentifierStyle::Quoted => literal::quoted(name),
            IdentifierStyle::Lowercase if literal::is_sql_reserved(name) => {
                literal::quoted(&name.to_lowercase())
            }
            _ if !literal::is_plain(name) => literal::quoted(name),
            IdentifierStyle::Lowercase => name.to_lowercase(),
            IdentifierStyle::Preserve => name.to_string(),
        }
    }
}

fn collect_tables<'q>(joins: &'q [Join], out: &mut Vec<&'q Table>) {
    for join in joins {
        out.push(&join.table);
        collect_tables(&join.joins, out);
    }
}

fn is_arithmetic(expr: &Expression) -> bool {
    match expr {
        Expression::BinaryOp { .. } => true,
        Expression::Function(f) => functions::arithmetic(&f.name).is_some() && f.args.len() >= 2,
        _ => false,
    }
}

fn indented(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|line| format!("{INDENT}{line}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quarry_catalog::{Catalog, Column as CatalogColumn, Links, Relation, Schema, Table as CatalogTable};
    use std::sync::Arc;

    fn resolver() -> RelationResolver {
        let table = |name: &str, cols: &[&str]| {
            let mut columns = vec![CatalogColumn::new("id").primary(1)];
            columns.extend(cols.iter().map(|c| CatalogColumn::new(*c)));
            CatalogTable::new(name, columns)
        };
        let schema = Schema {
            name: None,
            tables: vec![
                table("orders", &["customer_id", "amount"]),
                table("customers", &["name", "country"]),
                table("complaints", &["customer_id"]),
            ],
            relations: vec![
                Relation::new(
                    "placed",
                    "orders",
                    "customers",
                    vec!["customer_id".into()],
                    vec!["id".into()],
                )
                .symmetric(true),
                Relation::new(
                    "filed",
                    "complaints",
                    "customers",
                    vec!["customer_id".into()],
                    vec!["id".into()],
                )
                .symmetric(true),
            ],
        };
        RelationResolver::new(Arc::new(Catalog::new(schema, Links::new()).unwrap()))
    }

    fn col(alias: &str, name: &str) -> Expression {
        Expression::column(Some(alias), name)
    }

    fn eq(left: Expression, right: Expression) -> LogicalExpression {
        LogicalExpression::comparison(left, CompareOp::Eq, vec![right])
    }

    fn orders_customers(optional: bool) -> Select {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(col("o", "id")));
        let mut join = Join::new(Some("placed"), Table::new("customers", Some("c")));
        join.optional = optional;
        let mut select = Select::new(start);
        select.joins.push(join);
        select
    }

    fn sql(select: Select) -> String {
        SqlGenerator::ansi(resolver())
            .to_sql(&Query::new(Set::select(select)))
            .unwrap()
    }

    // ===== select layout =====

    #[test]
    fn test_inner_join_filters_go_to_where() {
        let mut select = orders_customers(false);
        select.joins[0].table.filter = Some(eq(col("c", "country"), Expression::Text("DE".into())));
        select.limit = 10;
        assert_eq!(
            sql(select),
            "SELECT o.id\n\
             FROM orders o\n\
             INNER JOIN customers c ON o.customer_id = c.id\n\
             WHERE c.country = 'DE'\n\
             FETCH FIRST 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_optional_join_filter_goes_to_on() {
        let mut select = orders_customers(true);
        select.joins[0].table.filter = Some(eq(col("c", "country"), Expression::Text("DE".into())));
        assert_eq!(
            sql(select),
            "SELECT o.id\n\
             FROM orders o\n\
             LEFT OUTER JOIN customers c ON o.customer_id = c.id AND c.country = 'DE'"
        );
    }

    #[test]
    fn test_invers_join_swaps_sides() {
        let mut select = Select::new(Table::new("customers", Some("c")));
        let mut join = Join::new(Some("placed"), Table::new("orders", Some("o")));
        join.invers = true;
        select.joins.push(join);
        assert_eq!(
            sql(select),
            "SELECT *\nFROM customers c\nINNER JOIN orders o ON o.customer_id = c.id"
        );
    }

    #[test]
    fn test_outs_sorted_by_index_then_natural() {
        let mut start = Table::new("customers", Some("c"));
        let mut name = Out::new(col("c", "name"));
        name.idx = 2;
        let mut country = Out::new(col("c", "country"));
        country.idx = 1;
        country.header = Some("land".into());
        start.out = vec![Out::new(col("c", "id")), name, country];
        assert_eq!(
            sql(Select::new(start)),
            "SELECT c.country AS land, c.name, c.id\nFROM customers c"
        );
    }

    #[test]
    fn test_group_having_order() {
        let mut select = orders_customers(false);
        let start = &mut select.start;
        start.out.push(Out::new(Expression::function("SUM", vec![col("o", "amount")])));
        start.group.push(Group {
            key: Key::Expression(col("o", "id")),
        });
        start.order.push(Order {
            key: Key::Expression(col("o", "id")),
            asc: false,
        });
        select.having = Some(LogicalExpression::comparison(
            Expression::function("SUM", vec![col("o", "amount")]),
            CompareOp::Gt,
            vec![Expression::Number(100.0)],
        ));
        let rendered = sql(select);
        assert!(rendered.ends_with(
            "GROUP BY o.id\nHAVING SUM(o.amount) > 100\nORDER BY o.id DESC"
        ));
    }

    // ===== predicates =====

    #[test]
    fn test_or_inside_and_is_parenthesised() {
        let mut select = orders_customers(false);
        select.filter = Some(LogicalExpression::And(vec![
            LogicalExpression::Or(vec![
                eq(col("o", "amount"), Expression::Number(1.0)),
                eq(col("c", "name"), Expression::Text("x".into())),
            ]),
            LogicalExpression::Not(Box::new(eq(col("o", "id"), Expression::Number(2.0)))),
        ]));
        assert!(sql(select).ends_with(
            "WHERE (o.amount = 1 OR c.name = 'x') AND NOT (o.id = 2)"
        ));
    }

    #[test]
    fn test_between_in_and_null() {
        let mut select = Select::new(Table::new("orders", Some("o")));
        select.filter = Some(LogicalExpression::And(vec![
            LogicalExpression::comparison(
                col("o", "amount"),
                CompareOp::Between,
                vec![Expression::Number(1.5), Expression::Number(10.0)],
            ),
            LogicalExpression::comparison(
                col("o", "id"),
                CompareOp::NotIn,
                vec![Expression::Number(1.0), Expression::Number(2.0)],
            ),
            LogicalExpression::comparison(col("o", "customer_id"), CompareOp::IsNotNull, vec![]),
        ]));
        assert!(sql(select).ends_with(
            "WHERE o.amount BETWEEN 1.5 AND 10 AND o.id NOT IN (1, 2) AND o.customer_id IS NOT NULL"
        ));
    }

    #[test]
    fn test_exists_correlates_with_owner() {
        let mut select = Select::new(Table::new("customers", Some("c")));
        select.filter = Some(LogicalExpression::Var(UnaryLogicalExpression::Exists {
            parent: None,
            exists: Box::new(Exists {
                crit: Some("filed".into()),
                invers: true,
                table: Table::new("complaints", Some("x")),
                alias: None,
                joins: vec![],
            }),
        }));
        assert_eq!(
            sql(select),
            "SELECT *\nFROM customers c\nWHERE EXISTS (SELECT 1 FROM complaints x WHERE x.customer_id = c.id)"
        );
    }

    #[test]
    fn test_between_arity_is_structural() {
        let mut select = Select::new(Table::new("orders", Some("o")));
        select.filter = Some(LogicalExpression::comparison(
            col("o", "amount"),
            CompareOp::Between,
            vec![Expression::Number(1.0)],
        ));
        let err = SqlGenerator::ansi(resolver())
            .to_sql(&Query::new(Set::select(select)))
            .unwrap_err();
        assert!(matches!(err, RenderError::Structural(_)));
    }

    // ===== expressions and literals =====

    #[test]
    fn test_arithmetic_functions_render_infix() {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(Expression::function(
            "multiply",
            vec![col("o", "amount"), Expression::Number(1.19)],
        )));
        assert_eq!(
            sql(Select::new(start)),
            "SELECT o.amount * 1.19\nFROM orders o"
        );
    }

    #[test]
    fn test_nested_arithmetic_functions_keep_their_grouping() {
        let mut start = Table::new("orders", Some("o"));
        start.out.push(Out::new(Expression::function(
            "multiply",
            vec![
                Expression::function("add", vec![col("o", "net"), col("o", "tax")]),
                Expression::Number(2.0),
            ],
        )));
        assert_eq!(
            sql(Select::new(start)),
            "SELECT (o.net + o.tax) * 2\nFROM orders o"
        );
    }

    #[test]
    fn test_jdbc_dates() {
        let mut select = Select::new(Table::new("orders", Some("o")));
        select.filter = Some(LogicalExpression::comparison(
            col("o", "ordered_at"),
            CompareOp::Ge,
            vec![Expression::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())],
        ));
        let query = Query::new(Set::select(select));
        let ansi = SqlGenerator::ansi(resolver()).to_sql(&query).unwrap();
        let jdbc = SqlGenerator::jdbc(resolver()).to_sql(&query).unwrap();
        assert!(ansi.ends_with("o.ordered_at >= DATE '2024-01-01'"));
        assert!(jdbc.ends_with("o.ordered_at >= {d '2024-01-01'}"));
    }

    #[test]
    fn test_identifier_styles() {
        let mut start = Table::new("Orders", Some("O"));
        start.out.push(Out::new(col("O", "2024")));
        let query = Query::new(Set::select(Select::new(start)));

        let lower = SqlGenerator::ansi(resolver()).to_sql(&query).unwrap();
        assert_eq!(lower, "SELECT o.\"2024\"\nFROM orders o");

        let quoted = SqlGenerator::ansi(resolver())
            .with_identifiers(IdentifierStyle::Quoted)
            .to_sql(&query)
            .unwrap();
        assert_eq!(quoted, "SELECT \"O\".\"2024\"\nFROM \"Orders\" \"O\"");
    }

    #[test]
    fn test_reserved_words_are_quoted() {
        let mut start = Table::new("Order", Some("o"));
        start.out.push(Out::new(col("o", "group")));
        let query = Query::new(Set::select(Select::new(start)));

        let lower = SqlGenerator::ansi(resolver()).to_sql(&query).unwrap();
        assert_eq!(lower, "SELECT o.\"group\"\nFROM \"order\" o");

        let preserved = SqlGenerator::ansi(resolver())
            .with_identifiers(IdentifierStyle::Preserve)
            .to_sql(&query)
            .unwrap();
        assert_eq!(preserved, "SELECT o.\"group\"\nFROM \"Order\" o");
    }

    // ===== query layout =====

    #[test]
    fn test_blocks_and_set_operations() {
        let block = Block {
            id: "big".into(),
            set: Set::select(Select::new(Table::new("orders", Some("o")))),
        };
        let left = Set::select(Select::new(Table::new("customers", Some("a"))));
        let right = Set::select(Select::new(Table::new("customers", Some("b"))));
        let third = Set::select(Select::new(Table::new("customers", Some("d"))));
        let mut query = Query::new(Set::compound(
            SetOperator::Minus,
            Set::compound(SetOperator::UnionAll, left, right),
            third,
        ));
        query.description = Some("customers\nexcept some".into());
        query.blocks.push(block);

        assert_eq!(
            SqlGenerator::ansi(resolver()).to_sql(&query).unwrap(),
            "-- customers\n\
             -- except some\n\
             WITH big AS (\n  SELECT *\n  FROM orders o\n)\n\
             (\n  SELECT *\n  FROM customers a\n  UNION ALL\n  SELECT *\n  FROM customers b\n)\n\
             EXCEPT\n\
             SELECT *\nFROM customers d"
        );
    }

    #[test]
    fn test_unknown_relation_is_a_resolve_error() {
        let mut select = Select::new(Table::new("orders", Some("o")));
        select
            .joins
            .push(Join::new(Some("nope"), Table::new("complaints", Some("x"))));
        let err = SqlGenerator::ansi(resolver())
            .to_sql(&Query::new(Set::select(select)))
            .unwrap_err();
        assert!(matches!(err, RenderError::Resolve(_)));
    }
}
