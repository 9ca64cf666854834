//! SQL text generation from processed trees.

use crate::node::{NodeId, NodeKind, Operator, SqlTree};
use sqlflush_core::error::BuilderErrorKind;
use sqlflush_core::{Dialect, Error, FlushConfig, IdentifierQuoting, Result, Value};

/// One bound parameter of a generated statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSlot {
    /// 1-based parameter position
    pub position: usize,
    /// Attribute the slot is bound to, for per-row binding slots
    pub attribute: Option<String>,
    /// Value captured at generation time
    pub value: Value,
}

/// Generated SQL with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<ParamSlot>,
    /// Rows to skip after fetching, for dialects without OFFSET
    pub fetch_offset: Option<u64>,
}

impl Statement {
    /// Parameter values in position order.
    pub fn values(&self) -> Vec<Value> {
        self.params.iter().map(|p| p.value.clone()).collect()
    }
}

/// Renders [`SqlTree`]s for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct SqlGenerator {
    dialect: Dialect,
    quoting: IdentifierQuoting,
}

impl SqlGenerator {
    /// Generator with unquoted identifiers.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            quoting: IdentifierQuoting::Never,
        }
    }

    pub fn from_config(config: &FlushConfig) -> Self {
        Self::new(config.dialect).quoting(config.identifier_quoting)
    }

    /// Set the identifier quoting strategy.
    pub fn quoting(mut self, quoting: IdentifierQuoting) -> Self {
        self.quoting = quoting;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Render the tree. The tree should already have been run through the
    /// dialect's processor.
    #[tracing::instrument(level = "trace", skip(self, tree), fields(dialect = %self.dialect))]
    pub fn generate(&self, tree: &SqlTree) -> Result<Statement> {
        let mut writer = Writer {
            generator: self,
            tree,
            sql: String::new(),
            params: Vec::new(),
        };
        writer.node(tree.root())?;
        tracing::trace!(sql = %writer.sql, params = writer.params.len(), "Generated SQL");
        Ok(Statement {
            sql: writer.sql,
            params: writer.params,
            fetch_offset: tree.fetch_offset,
        })
    }

    fn ident(&self, name: &str) -> String {
        self.quoting.render(name, self.dialect)
    }
}

struct Writer<'a> {
    generator: &'a SqlGenerator,
    tree: &'a SqlTree,
    sql: String,
    params: Vec<ParamSlot>,
}

impl Writer<'_> {
    fn child(&self, id: NodeId, index: usize) -> Result<NodeId> {
        self.tree.child(id, index).ok_or_else(|| {
            Error::builder(
                BuilderErrorKind::MissingClause,
                format!(
                    "{} node {} has no operand {}",
                    self.tree.kind(id).name(),
                    id,
                    index + 1
                ),
            )
        })
    }

    fn list(&mut self, ids: &[NodeId], separator: &str) -> Result<()> {
        for (i, &id) in ids.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(separator);
            }
            self.node(id)?;
        }
        Ok(())
    }

    fn ident(&mut self, name: &str) {
        let rendered = self.generator.ident(name);
        self.sql.push_str(&rendered);
    }

    /// Render statement clauses separated by spaces, skipping empty ones.
    fn clauses(&mut self, ids: &[NodeId]) -> Result<()> {
        for &id in ids {
            let mark = self.sql.len();
            self.sql.push(' ');
            self.node(id)?;
            if self.sql.len() == mark + 1 {
                self.sql.truncate(mark);
            }
        }
        Ok(())
    }

    fn node(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        let children = tree.children(id);
        match tree.kind(id) {
            // ==================== Statements ====================
            NodeKind::Select => {
                let nested = tree.parent(id).is_some();
                if nested {
                    self.sql.push('(');
                }
                self.sql.push_str("SELECT");
                self.clauses(children)?;
                if nested {
                    self.sql.push(')');
                }
            }
            NodeKind::Insert => {
                self.sql.push_str("INSERT INTO ");
                self.list(children, " ")?;
            }
            NodeKind::Update => {
                self.sql.push_str("UPDATE ");
                self.list(children, " ")?;
            }
            NodeKind::Delete => {
                self.sql.push_str("DELETE FROM ");
                self.list(children, " ")?;
            }

            // ==================== Clauses ====================
            NodeKind::Distinct => self.sql.push_str("DISTINCT"),
            NodeKind::Top { count } => self.sql.push_str(&format!("TOP {count}")),
            NodeKind::ResultList => self.list(children, ", ")?,
            NodeKind::From => {
                self.sql.push_str("FROM ");
                for (i, &child) in children.iter().enumerate() {
                    if matches!(tree.kind(child), NodeKind::Join { .. }) {
                        self.sql.push(' ');
                    } else if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.node(child)?;
                }
            }
            NodeKind::Where => {
                self.sql.push_str("WHERE ");
                self.node(self.child(id, 0)?)?;
            }
            NodeKind::GroupBy => {
                self.sql.push_str("GROUP BY ");
                self.list(children, ", ")?;
            }
            NodeKind::Having => {
                self.sql.push_str("HAVING ");
                self.node(self.child(id, 0)?)?;
            }
            NodeKind::OrderBy => {
                self.sql.push_str("ORDER BY ");
                self.list(children, ", ")?;
            }
            NodeKind::LimitOffset { limit, offset } => {
                let mut parts = Vec::new();
                if let Some(limit) = limit {
                    parts.push(format!("LIMIT {limit}"));
                }
                if let Some(offset) = offset.filter(|&o| o > 0) {
                    parts.push(format!("OFFSET {offset}"));
                }
                self.sql.push_str(&parts.join(" "));
            }
            NodeKind::Columns => {
                self.sql.push('(');
                self.list(children, ", ")?;
                self.sql.push(')');
            }
            NodeKind::Values => {
                self.sql.push_str("VALUES (");
                self.list(children, ", ")?;
                self.sql.push(')');
            }
            NodeKind::Set => {
                self.sql.push_str("SET ");
                self.list(children, ", ")?;
            }
            NodeKind::Assignment => {
                self.node(self.child(id, 0)?)?;
                self.sql.push_str(" = ");
                self.node(self.child(id, 1)?)?;
            }

            // ==================== Expressions ====================
            NodeKind::Table { name, alias } => {
                self.ident(name);
                if let Some(alias) = alias {
                    self.sql.push(' ');
                    self.ident(alias);
                }
            }
            NodeKind::Join { kind } => {
                self.sql.push_str(kind.as_str());
                self.sql.push(' ');
                self.node(self.child(id, 0)?)?;
                self.sql.push_str(" ON ");
                self.node(self.child(id, 1)?)?;
            }
            NodeKind::Column { table, name, alias } => {
                if let Some(table) = table {
                    self.ident(table);
                    self.sql.push('.');
                }
                self.ident(name);
                if let Some(alias) = alias {
                    self.sql.push_str(" AS ");
                    self.ident(alias);
                }
            }
            NodeKind::Value { value, attribute } => {
                let position = self.params.len() + 1;
                self.params.push(ParamSlot {
                    position,
                    attribute: attribute.clone(),
                    value: value.clone(),
                });
                let placeholder = self.generator.dialect.placeholder(position);
                self.sql.push_str(&placeholder);
            }
            NodeKind::Star => self.sql.push('*'),
            NodeKind::Operator { op } => {
                if children.len() < 2 {
                    return Err(Error::builder(
                        BuilderErrorKind::MissingClause,
                        format!("operator {} needs two operands", op.as_str()),
                    ));
                }
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        self.sql.push(' ');
                        self.sql.push_str(op.as_str());
                        self.sql.push(' ');
                    }
                    self.operand(*op, child, i > 0)?;
                }
            }
            NodeKind::Not => {
                self.sql.push_str("NOT ");
                let operand = self.child(id, 0)?;
                let wrap = matches!(tree.kind(operand), NodeKind::Operator { .. });
                self.wrapped(operand, wrap)?;
            }
            NodeKind::Function { name, alias, .. } => {
                self.sql.push_str(name);
                self.sql.push('(');
                self.list(children, ", ")?;
                self.sql.push(')');
                if let Some(alias) = alias {
                    self.sql.push_str(" AS ");
                    self.ident(alias);
                }
            }
            NodeKind::IsNull { negated } => {
                self.node(self.child(id, 0)?)?;
                self.sql
                    .push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            NodeKind::InList { negated } => {
                self.node(self.child(id, 0)?)?;
                self.sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
                self.list(&children[1..], ", ")?;
                self.sql.push(')');
            }
            NodeKind::Between => {
                self.node(self.child(id, 0)?)?;
                self.sql.push_str(" BETWEEN ");
                self.node(self.child(id, 1)?)?;
                self.sql.push_str(" AND ");
                self.node(self.child(id, 2)?)?;
            }
            NodeKind::Like { case_insensitive } => {
                let operand = self.child(id, 0)?;
                let pattern = self.child(id, 1)?;
                if !*case_insensitive {
                    self.node(operand)?;
                    self.sql.push_str(" LIKE ");
                    self.node(pattern)?;
                } else if self.generator.dialect == Dialect::Postgres {
                    self.node(operand)?;
                    self.sql.push_str(" ILIKE ");
                    self.node(pattern)?;
                } else {
                    // Fallback for dialects without ILIKE
                    self.sql.push_str("LOWER(");
                    self.node(operand)?;
                    self.sql.push_str(") LIKE LOWER(");
                    self.node(pattern)?;
                    self.sql.push(')');
                }
            }
            NodeKind::Case => {
                self.sql.push_str("CASE");
                for &branch in children {
                    self.sql.push(' ');
                    self.node(branch)?;
                }
                self.sql.push_str(" END");
            }
            NodeKind::When => {
                self.sql.push_str("WHEN ");
                self.node(self.child(id, 0)?)?;
                self.sql.push_str(" THEN ");
                self.node(self.child(id, 1)?)?;
            }
            NodeKind::Else => {
                self.sql.push_str("ELSE ");
                self.node(self.child(id, 0)?)?;
            }
            NodeKind::Exists => {
                self.sql.push_str("EXISTS ");
                self.node(self.child(id, 0)?)?;
            }
            NodeKind::Aliased { alias } => {
                let inner = self.child(id, 0)?;
                let wrap = matches!(tree.kind(inner), NodeKind::Operator { .. });
                self.wrapped(inner, wrap)?;
                self.sql.push_str(" AS ");
                self.ident(alias);
            }
            NodeKind::Sort { descending } => {
                self.node(self.child(id, 0)?)?;
                self.sql.push_str(if *descending { " DESC" } else { " ASC" });
            }
            NodeKind::Text(raw) => self.sql.push_str(raw),
        }
        Ok(())
    }

    /// Render an operator operand, parenthesized when it binds looser than
    /// the parent. An equally binding right operand is only left bare when it
    /// repeats the parent's associative operator.
    fn operand(&mut self, parent: Operator, id: NodeId, right: bool) -> Result<()> {
        let wrap = match self.tree.kind(id) {
            NodeKind::Operator { op } => {
                let associative = matches!(
                    parent,
                    Operator::And | Operator::Or | Operator::Add | Operator::Mul | Operator::Concat
                );
                op.precedence() < parent.precedence()
                    || (right
                        && op.precedence() == parent.precedence()
                        && !(*op == parent && associative))
            }
            _ => false,
        };
        self.wrapped(id, wrap)
    }

    fn wrapped(&mut self, id: NodeId, wrap: bool) -> Result<()> {
        if wrap {
            self.sql.push('(');
        }
        self.node(id)?;
        if wrap {
            self.sql.push(')');
        }
        Ok(())
    }
}
