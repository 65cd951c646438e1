//! Ancestor-aware preorder traversal of the query tree
//!
//! The walker hands every node to a [`Visitor`] together with the stack of
//! its ancestors (innermost last). Nodes never point back at their parents;
//! anything a visitor needs to know about the surrounding tree comes from the
//! [`Ancestors`] stack.

use crate::ast::*;

/// Borrowed reference to any node of the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Query(&'a Query),
    Block(&'a Block),
    Set(&'a Set),
    Select(&'a Select),
    Join(&'a Join),
    Exists(&'a Exists),
    Table(&'a Table),
    Out(&'a Out),
    Group(&'a Group),
    Order(&'a Order),
    Logical(&'a LogicalExpression),
    Unary(&'a UnaryLogicalExpression),
    Expression(&'a Expression),
    Function(&'a Function),
    Column(&'a Column),
}

/// Ancestors of the node being visited.
#[derive(Debug, Default)]
pub struct Ancestors<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Ancestors<'a> {
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The `n`-th ancestor counting outwards, 1 being the direct parent.
    pub fn nth(&self, n: usize) -> Option<NodeRef<'a>> {
        if n == 0 || n > self.stack.len() {
            return None;
        }
        self.stack.get(self.stack.len() - n).copied()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.nth(1)
    }

    /// Ancestors from the direct parent outwards.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'a>> + '_ {
        self.stack.iter().rev().copied()
    }

    /// Nearest enclosing select.
    pub fn select(&self) -> Option<&'a Select> {
        self.iter().find_map(|node| match node {
            NodeRef::Select(select) => Some(select),
            _ => None,
        })
    }

    /// Table with `alias` anywhere inside the nearest enclosing select.
    pub fn table(&self, alias: &str) -> Option<&'a Table> {
        self.select().and_then(|select| find_table(select, alias))
    }

    /// The table a predicate or join edge is anchored to: the innermost
    /// enclosing table, exists or join target, or the start of the enclosing select.
    pub fn context_table(&self) -> Option<&'a Table> {
        self.iter().find_map(|node| match node {
            NodeRef::Table(table) => Some(table),
            NodeRef::Join(join) => Some(&join.table),
            NodeRef::Exists(exists) => Some(&exists.table),
            NodeRef::Select(select) => Some(&select.start),
            _ => None,
        })
    }

    fn push(&mut self, node: NodeRef<'a>) {
        self.stack.push(node);
    }

    fn pop(&mut self) {
        self.stack.pop();
    }
}

/// Callbacks for [`walk`]. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait Visitor<'a> {
    type Error;

    fn visit_query(&mut self, ancestors: &Ancestors<'a>, query: &'a Query) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_block(&mut self, ancestors: &Ancestors<'a>, block: &'a Block) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_set(&mut self, ancestors: &Ancestors<'a>, set: &'a Set) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_select(&mut self, ancestors: &Ancestors<'a>, select: &'a Select) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_join(&mut self, ancestors: &Ancestors<'a>, join: &'a Join) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_exists(&mut self, ancestors: &Ancestors<'a>, exists: &'a Exists) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_table(&mut self, ancestors: &Ancestors<'a>, table: &'a Table) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_out(&mut self, ancestors: &Ancestors<'a>, out: &'a Out) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_group(&mut self, ancestors: &Ancestors<'a>, group: &'a Group) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_order(&mut self, ancestors: &Ancestors<'a>, order: &'a Order) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_logical(
        &mut self,
        ancestors: &Ancestors<'a>,
        logical: &'a LogicalExpression,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_unary(
        &mut self,
        ancestors: &Ancestors<'a>,
        unary: &'a UnaryLogicalExpression,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_expression(
        &mut self,
        ancestors: &Ancestors<'a>,
        expression: &'a Expression,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_function(&mut self, ancestors: &Ancestors<'a>, function: &'a Function) -> Result<(), Self::Error> {
        Ok(())
    }
    fn visit_column(&mut self, ancestors: &Ancestors<'a>, column: &'a Column) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Walk a whole query: blocks first, then the body.
pub fn walk<'a, V: Visitor<'a>>(query: &'a Query, visitor: &mut V) -> Result<(), V::Error> {
    Walker::new(visitor).query(query)
}

/// Walk a single select and everything below it.
pub fn walk_select<'a, V: Visitor<'a>>(select: &'a Select, visitor: &mut V) -> Result<(), V::Error> {
    Walker::new(visitor).select(select)
}

/// Walk a predicate and everything below it.
pub fn walk_logical<'a, V: Visitor<'a>>(
    logical: &'a LogicalExpression,
    visitor: &mut V,
) -> Result<(), V::Error> {
    Walker::new(visitor).logical(logical)
}

/// First table with `alias` in preorder below `select`, subqueries included.
pub fn find_table<'a>(select: &'a Select, alias: &str) -> Option<&'a Table> {
    struct Finder<'s> {
        alias: &'s str,
    }

    impl<'a> Visitor<'a> for Finder<'_> {
        type Error = &'a Table;

        fn visit_table(&mut self, _: &Ancestors<'a>, table: &'a Table) -> Result<(), &'a Table> {
            if table.has_alias(self.alias) {
                Err(table)
            } else {
                Ok(())
            }
        }
    }

    walk_select(select, &mut Finder { alias }).err()
}

struct Walker<'a, 'v, V> {
    ancestors: Ancestors<'a>,
    visitor: &'v mut V,
}

impl<'a, 'v, V: Visitor<'a>> Walker<'a, 'v, V> {
    fn new(visitor: &'v mut V) -> Self {
        Self {
            ancestors: Ancestors::default(),
            visitor,
        }
    }

    fn query(&mut self, query: &'a Query) -> Result<(), V::Error> {
        self.visitor.visit_query(&self.ancestors, query)?;
        self.ancestors.push(NodeRef::Query(query));
        for block in &query.blocks {
            self.visitor.visit_block(&self.ancestors, block)?;
            self.ancestors.push(NodeRef::Block(block));
            self.set(&block.set)?;
            self.ancestors.pop();
        }
        self.set(&query.set)?;
        self.ancestors.pop();
        Ok(())
    }

    fn set(&mut self, set: &'a Set) -> Result<(), V::Error> {
        self.visitor.visit_set(&self.ancestors, set)?;
        self.ancestors.push(NodeRef::Set(set));
        match set {
            Set::Select(select) => self.select(select)?,
            Set::Compound { left, right, .. } => {
                self.set(left)?;
                self.set(right)?;
            }
        }
        self.ancestors.pop();
        Ok(())
    }

    fn select(&mut self, select: &'a Select) -> Result<(), V::Error> {
        self.visitor.visit_select(&self.ancestors, select)?;
        self.ancestors.push(NodeRef::Select(select));
        self.table(&select.start)?;
        if let Some(filter) = &select.filter {
            self.logical(filter)?;
        }
        if let Some(having) = &select.having {
            self.logical(having)?;
        }
        for join in &select.joins {
            self.join(join)?;
        }
        self.ancestors.pop();
        Ok(())
    }

    fn join(&mut self, join: &'a Join) -> Result<(), V::Error> {
        self.visitor.visit_join(&self.ancestors, join)?;
        self.ancestors.push(NodeRef::Join(join));
        self.table(&join.table)?;
        for nested in &join.joins {
            self.join(nested)?;
        }
        self.ancestors.pop();
        Ok(())
    }

    fn exists(&mut self, exists: &'a Exists) -> Result<(), V::Error> {
        self.visitor.visit_exists(&self.ancestors, exists)?;
        self.ancestors.push(NodeRef::Exists(exists));
        self.table(&exists.table)?;
        for join in &exists.joins {
            self.join(join)?;
        }
        self.ancestors.pop();
        Ok(())
    }

    fn table(&mut self, table: &'a Table) -> Result<(), V::Error> {
        self.visitor.visit_table(&self.ancestors, table)?;
        self.ancestors.push(NodeRef::Table(table));
        for out in &table.out {
            self.visitor.visit_out(&self.ancestors, out)?;
            self.ancestors.push(NodeRef::Out(out));
            self.expression(&out.expression)?;
            self.ancestors.pop();
        }
        if let Some(filter) = &table.filter {
            self.logical(filter)?;
        }
        if let Some(having) = &table.having {
            self.logical(having)?;
        }
        for group in &table.group {
            self.visitor.visit_group(&self.ancestors, group)?;
            self.ancestors.push(NodeRef::Group(group));
            self.key(&group.key)?;
            self.ancestors.pop();
        }
        for order in &table.order {
            self.visitor.visit_order(&self.ancestors, order)?;
            self.ancestors.push(NodeRef::Order(order));
            self.key(&order.key)?;
            self.ancestors.pop();
        }
        self.ancestors.pop();
        Ok(())
    }

    fn key(&mut self, key: &'a Key) -> Result<(), V::Error> {
        match key {
            Key::Expression(expression) => self.expression(expression),
            Key::Header(_) => Ok(()),
        }
    }

    fn logical(&mut self, logical: &'a LogicalExpression) -> Result<(), V::Error> {
        self.visitor.visit_logical(&self.ancestors, logical)?;
        self.ancestors.push(NodeRef::Logical(logical));
        match logical {
            LogicalExpression::Var(unary) => self.unary(unary)?,
            LogicalExpression::Not(child) => self.logical(child)?,
            LogicalExpression::And(children) | LogicalExpression::Or(children) => {
                for child in children {
                    self.logical(child)?;
                }
            }
        }
        self.ancestors.pop();
        Ok(())
    }

    fn unary(&mut self, unary: &'a UnaryLogicalExpression) -> Result<(), V::Error> {
        self.visitor.visit_unary(&self.ancestors, unary)?;
        self.ancestors.push(NodeRef::Unary(unary));
        match unary {
            UnaryLogicalExpression::Nested(node) => self.logical(node)?,
            UnaryLogicalExpression::Exists { exists, .. } => self.exists(exists)?,
            UnaryLogicalExpression::Comparison { left, right, .. } => {
                self.expression(left)?;
                for expression in right {
                    self.expression(expression)?;
                }
            }
        }
        self.ancestors.pop();
        Ok(())
    }

    fn expression(&mut self, expression: &'a Expression) -> Result<(), V::Error> {
        self.visitor.visit_expression(&self.ancestors, expression)?;
        self.ancestors.push(NodeRef::Expression(expression));
        match expression {
            Expression::Set(set) => self.set(set)?,
            Expression::BinaryOp { left, right, .. } => {
                self.expression(left)?;
                self.expression(right)?;
            }
            Expression::Grouped(inner) => self.expression(inner)?,
            Expression::Function(function) => {
                self.visitor.visit_function(&self.ancestors, function)?;
                self.ancestors.push(NodeRef::Function(function));
                for arg in &function.args {
                    self.expression(arg)?;
                }
                self.ancestors.pop();
            }
            Expression::Column(column) => self.visitor.visit_column(&self.ancestors, column)?,
            Expression::Text(_)
            | Expression::Number(_)
            | Expression::Date(_)
            | Expression::DateTime(_)
            | Expression::Time(_)
            | Expression::Identity(_) => {}
        }
        self.ancestors.pop();
        Ok(())
    }
}
