//! Fluent builders producing [`SqlTree`]s.
//!
//! Expressions are assembled as owned [`ExprBuilder`] fragments and copied
//! into the arena when a statement is built. Statement builders keep one slot
//! per clause, so clauses always come out in canonical order no matter in
//! which order the builder methods were called.

use crate::alias::SuppressAliasVisitor;
use crate::case_when::CaseWhenBuilder;
use crate::node::{JoinKind, NodeId, NodeKind, Operator, SqlTree};
use sqlflush_core::error::BuilderErrorKind;
use sqlflush_core::{Error, Result, Value};

/// An owned expression fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprBuilder {
    kind: NodeKind,
    children: Vec<ExprBuilder>,
}

impl ExprBuilder {
    pub(crate) fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub(crate) fn with_children(kind: NodeKind, children: Vec<ExprBuilder>) -> Self {
        Self { kind, children }
    }

    /// Kind of the fragment's top node.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Direct sub-expressions.
    pub fn children(&self) -> &[ExprBuilder] {
        &self.children
    }

    fn push(&mut self, child: ExprBuilder) {
        self.children.push(child);
    }

    fn operator(mut self, op: Operator, other: impl Into<ExprBuilder>) -> Self {
        let other = other.into();
        // AND, OR and || chains stay flat
        let chains = matches!(op, Operator::And | Operator::Or | Operator::Concat);
        if chains && self.kind == (NodeKind::Operator { op }) {
            self.children.push(other);
            return self;
        }
        Self::with_children(NodeKind::Operator { op }, vec![self, other])
    }

    // ==================== Comparison ====================

    pub fn eq(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Eq, other)
    }

    pub fn ne(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Ne, other)
    }

    pub fn lt(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Lt, other)
    }

    pub fn le(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Le, other)
    }

    pub fn gt(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Gt, other)
    }

    pub fn ge(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Ge, other)
    }

    // ==================== Pattern Matching ====================

    /// LIKE pattern.
    pub fn like(self, pattern: impl Into<ExprBuilder>) -> Self {
        Self::with_children(
            NodeKind::Like {
                case_insensitive: false,
            },
            vec![self, pattern.into()],
        )
    }

    /// Case-insensitive LIKE (`ILIKE` where supported).
    pub fn ilike(self, pattern: impl Into<ExprBuilder>) -> Self {
        Self::with_children(
            NodeKind::Like {
                case_insensitive: true,
            },
            vec![self, pattern.into()],
        )
    }

    // ==================== IN / BETWEEN / NULL ====================

    pub fn in_list<I, E>(self, values: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ExprBuilder>,
    {
        let mut children = vec![self];
        children.extend(values.into_iter().map(Into::into));
        Self::with_children(NodeKind::InList { negated: false }, children)
    }

    pub fn between(self, low: impl Into<ExprBuilder>, high: impl Into<ExprBuilder>) -> Self {
        Self::with_children(NodeKind::Between, vec![self, low.into(), high.into()])
    }

    pub fn is_null(self) -> Self {
        Self::with_children(NodeKind::IsNull { negated: false }, vec![self])
    }

    pub fn is_not_null(self) -> Self {
        Self::with_children(NodeKind::IsNull { negated: true }, vec![self])
    }

    // ==================== Arithmetic ====================

    pub fn plus(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Add, other)
    }

    pub fn minus(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Sub, other)
    }

    pub fn mul(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Mul, other)
    }

    pub fn div(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Div, other)
    }

    pub fn modulo(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Mod, other)
    }

    /// String concatenation with the `||` operator.
    pub fn concat(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Concat, other)
    }

    // ==================== Logical ====================

    pub fn and(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::And, other)
    }

    pub fn or(self, other: impl Into<ExprBuilder>) -> Self {
        self.operator(Operator::Or, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::with_children(NodeKind::Not, vec![self])
    }

    // ==================== Ordering / Aliasing ====================

    pub fn asc(self) -> Self {
        Self::with_children(NodeKind::Sort { descending: false }, vec![self])
    }

    pub fn desc(self) -> Self {
        Self::with_children(NodeKind::Sort { descending: true }, vec![self])
    }

    /// Attach an alias.
    ///
    /// Columns, functions and tables carry the alias themselves, replacing any
    /// previous one. Other expressions are wrapped in an aliased node; an
    /// already aliased expression gets its alias replaced.
    pub fn as_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        match &mut self.kind {
            NodeKind::Column { alias: slot, .. }
            | NodeKind::Function { alias: slot, .. }
            | NodeKind::Table { alias: slot, .. } => {
                *slot = Some(alias);
                self
            }
            NodeKind::Aliased { alias: slot } => {
                *slot = alias;
                self
            }
            _ => Self::with_children(NodeKind::Aliased { alias }, vec![self]),
        }
    }

    // ==================== Tree Assembly ====================

    /// Copy this fragment into `tree` below `parent`.
    pub fn attach(self, tree: &mut SqlTree, parent: NodeId) -> NodeId {
        let id = tree.add_child(parent, self.kind);
        for child in self.children {
            child.attach(tree, id);
        }
        id
    }

    /// Turn this fragment into a standalone tree.
    pub fn into_tree(self) -> SqlTree {
        let mut tree = SqlTree::new(self.kind);
        let root = tree.root();
        for child in self.children {
            child.attach(&mut tree, root);
        }
        tree
    }
}

impl From<Value> for ExprBuilder {
    fn from(value: Value) -> Self {
        SqlBuilder::value(value)
    }
}

impl From<&str> for ExprBuilder {
    fn from(s: &str) -> Self {
        SqlBuilder::value(Value::Text(s.to_string()))
    }
}

impl From<String> for ExprBuilder {
    fn from(s: String) -> Self {
        SqlBuilder::value(Value::Text(s))
    }
}

impl From<i32> for ExprBuilder {
    fn from(n: i32) -> Self {
        SqlBuilder::value(Value::Int(n))
    }
}

impl From<i64> for ExprBuilder {
    fn from(n: i64) -> Self {
        SqlBuilder::value(Value::BigInt(n))
    }
}

impl From<bool> for ExprBuilder {
    fn from(b: bool) -> Self {
        SqlBuilder::value(Value::Bool(b))
    }
}

impl From<f64> for ExprBuilder {
    fn from(n: f64) -> Self {
        SqlBuilder::value(Value::Double(n))
    }
}

/// Entry points for building SQL trees.
///
/// ```
/// use sqlflush_query::SqlBuilder;
///
/// let tree = SqlBuilder::select([SqlBuilder::column("name")])
///     .where_(SqlBuilder::column("id").eq(1_i64))
///     .from(SqlBuilder::table("artist"))
///     .build()
///     .unwrap();
/// assert!(tree.len() > 3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlBuilder;

impl SqlBuilder {
    // ==================== Statements ====================

    /// SELECT with the given result expressions.
    pub fn select<I>(columns: I) -> SelectBuilder
    where
        I: IntoIterator<Item = ExprBuilder>,
    {
        let mut select = SelectBuilder::default();
        let result = select.slot(SelectSlot::Result, NodeKind::ResultList);
        for column in columns {
            result.push(column);
        }
        select
    }

    /// `SELECT *`
    pub fn select_all() -> SelectBuilder {
        Self::select([ExprBuilder::leaf(NodeKind::Star)])
    }

    pub fn insert(table: impl Into<String>) -> InsertBuilder {
        InsertBuilder::new(Self::table(table))
    }

    pub fn update(table: impl Into<String>) -> UpdateBuilder {
        UpdateBuilder::new(Self::table(table))
    }

    pub fn delete(table: impl Into<String>) -> DeleteBuilder {
        DeleteBuilder::new(Self::table(table))
    }

    // ==================== Expressions ====================

    pub fn table(name: impl Into<String>) -> ExprBuilder {
        ExprBuilder::leaf(NodeKind::Table {
            name: name.into(),
            alias: None,
        })
    }

    pub fn column(name: impl Into<String>) -> ExprBuilder {
        ExprBuilder::leaf(NodeKind::Column {
            table: None,
            name: name.into(),
            alias: None,
        })
    }

    /// Column qualified by a table name or alias.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> ExprBuilder {
        ExprBuilder::leaf(NodeKind::Column {
            table: Some(table.into()),
            name: name.into(),
            alias: None,
        })
    }

    /// A bound parameter value.
    pub fn value(value: impl Into<Value>) -> ExprBuilder {
        ExprBuilder::leaf(NodeKind::Value {
            value: value.into(),
            attribute: None,
        })
    }

    /// A binding slot for `attribute`, populated per row at execution time.
    pub fn bound(attribute: impl Into<String>, value: impl Into<Value>) -> ExprBuilder {
        ExprBuilder::leaf(NodeKind::Value {
            value: value.into(),
            attribute: Some(attribute.into()),
        })
    }

    /// Raw SQL emitted verbatim.
    pub fn text(raw: impl Into<String>) -> ExprBuilder {
        ExprBuilder::leaf(NodeKind::Text(raw.into()))
    }

    pub fn function<I>(name: impl Into<String>, args: I) -> ExprBuilder
    where
        I: IntoIterator<Item = ExprBuilder>,
    {
        ExprBuilder::with_children(
            NodeKind::Function {
                name: name.into(),
                aggregate: false,
                alias: None,
            },
            args.into_iter().collect(),
        )
    }

    pub fn aggregate<I>(name: impl Into<String>, args: I) -> ExprBuilder
    where
        I: IntoIterator<Item = ExprBuilder>,
    {
        ExprBuilder::with_children(
            NodeKind::Function {
                name: name.into(),
                aggregate: true,
                alias: None,
            },
            args.into_iter().collect(),
        )
    }

    /// `COUNT(*)`
    pub fn count() -> ExprBuilder {
        Self::aggregate("COUNT", [ExprBuilder::leaf(NodeKind::Star)])
    }

    pub fn case_when() -> CaseWhenBuilder {
        CaseWhenBuilder::new()
    }

    /// `EXISTS (subquery)`
    pub fn exists(select: SelectBuilder) -> Result<ExprBuilder> {
        Ok(ExprBuilder::with_children(
            NodeKind::Exists,
            vec![select.into_expr()?],
        ))
    }

    pub fn aliased(expr: ExprBuilder, alias: impl Into<String>) -> ExprBuilder {
        expr.as_alias(alias)
    }

    /// Conjunction of all `exprs`; a single expression is returned as-is.
    pub fn and<I>(exprs: I) -> ExprBuilder
    where
        I: IntoIterator<Item = ExprBuilder>,
    {
        Self::chain(Operator::And, exprs)
    }

    /// Disjunction of all `exprs`; a single expression is returned as-is.
    pub fn or<I>(exprs: I) -> ExprBuilder
    where
        I: IntoIterator<Item = ExprBuilder>,
    {
        Self::chain(Operator::Or, exprs)
    }

    pub fn not(expr: ExprBuilder) -> ExprBuilder {
        expr.not()
    }

    fn chain<I>(op: Operator, exprs: I) -> ExprBuilder
    where
        I: IntoIterator<Item = ExprBuilder>,
    {
        let mut children: Vec<ExprBuilder> = exprs.into_iter().collect();
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return only;
            }
        }
        ExprBuilder::with_children(NodeKind::Operator { op }, children)
    }
}

// ==================== Slots ====================

fn missing(clause: &str, statement: &str) -> Error {
    Error::builder(
        BuilderErrorKind::MissingClause,
        format!("{statement} requires a {clause} clause"),
    )
}

/// AND a condition into a WHERE / HAVING clause fragment.
fn and_into(clause: &mut ExprBuilder, condition: ExprBuilder) {
    let combined = match clause.children.pop() {
        Some(previous) => previous.and(condition),
        None => condition,
    };
    clause.push(combined);
}

fn assemble<const N: usize>(kind: NodeKind, slots: [Option<ExprBuilder>; N]) -> ExprBuilder {
    ExprBuilder::with_children(kind, slots.into_iter().flatten().collect())
}

fn finish(expr: ExprBuilder) -> SqlTree {
    let statement = expr.kind.name();
    let clauses = expr.children.len();
    let mut tree = expr.into_tree();
    SuppressAliasVisitor.visit(&mut tree);
    tracing::trace!(statement, clauses, nodes = tree.len(), "Built SQL tree");
    tree
}

#[derive(Debug, Clone, Copy)]
enum SelectSlot {
    Distinct,
    Result,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    LimitOffset,
}

const SELECT_SLOTS: usize = 8;

/// SELECT statement builder.
#[derive(Debug, Clone, Default)]
pub struct SelectBuilder {
    slots: [Option<ExprBuilder>; SELECT_SLOTS],
}

impl SelectBuilder {
    fn slot(&mut self, slot: SelectSlot, kind: NodeKind) -> &mut ExprBuilder {
        self.slots[slot as usize].get_or_insert_with(|| ExprBuilder::leaf(kind))
    }

    pub fn distinct(mut self) -> Self {
        self.slot(SelectSlot::Distinct, NodeKind::Distinct);
        self
    }

    /// Add a result expression.
    pub fn column(mut self, expr: ExprBuilder) -> Self {
        self.slot(SelectSlot::Result, NodeKind::ResultList).push(expr);
        self
    }

    pub fn from(mut self, table: ExprBuilder) -> Self {
        self.slot(SelectSlot::From, NodeKind::From).push(table);
        self
    }

    pub fn join(self, table: ExprBuilder, on: ExprBuilder) -> Self {
        self.join_kind(JoinKind::Inner, table, on)
    }

    pub fn left_join(self, table: ExprBuilder, on: ExprBuilder) -> Self {
        self.join_kind(JoinKind::Left, table, on)
    }

    fn join_kind(mut self, kind: JoinKind, table: ExprBuilder, on: ExprBuilder) -> Self {
        let join = ExprBuilder::with_children(NodeKind::Join { kind }, vec![table, on]);
        self.slot(SelectSlot::From, NodeKind::From).push(join);
        self
    }

    /// Add a WHERE condition. Repeated calls are ANDed.
    pub fn where_(mut self, condition: ExprBuilder) -> Self {
        and_into(self.slot(SelectSlot::Where, NodeKind::Where), condition);
        self
    }

    pub fn group_by(mut self, expr: ExprBuilder) -> Self {
        self.slot(SelectSlot::GroupBy, NodeKind::GroupBy).push(expr);
        self
    }

    /// Add a HAVING condition. Repeated calls are ANDed.
    pub fn having(mut self, condition: ExprBuilder) -> Self {
        and_into(self.slot(SelectSlot::Having, NodeKind::Having), condition);
        self
    }

    /// Add an ORDER BY expression; ascending unless built with `desc()`.
    pub fn order_by(mut self, expr: ExprBuilder) -> Self {
        let expr = if matches!(expr.kind, NodeKind::Sort { .. }) {
            expr
        } else {
            expr.asc()
        };
        self.slot(SelectSlot::OrderBy, NodeKind::OrderBy).push(expr);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        if let NodeKind::LimitOffset { limit, .. } = &mut self.limit_offset().kind {
            *limit = Some(n);
        }
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        if let NodeKind::LimitOffset { offset, .. } = &mut self.limit_offset().kind {
            *offset = Some(n);
        }
        self
    }

    fn limit_offset(&mut self) -> &mut ExprBuilder {
        self.slot(
            SelectSlot::LimitOffset,
            NodeKind::LimitOffset {
                limit: None,
                offset: None,
            },
        )
    }

    /// Assemble the statement as an expression, usable as a subquery.
    pub fn into_expr(self) -> Result<ExprBuilder> {
        let has_result = self.slots[SelectSlot::Result as usize]
            .as_ref()
            .is_some_and(|r| !r.children.is_empty());
        if !has_result {
            return Err(missing("result", "SELECT"));
        }
        Ok(assemble(NodeKind::Select, self.slots))
    }

    pub fn build(self) -> Result<SqlTree> {
        Ok(finish(self.into_expr()?))
    }
}

#[derive(Debug, Clone, Copy)]
enum InsertSlot {
    Table,
    Columns,
    Values,
}

/// INSERT statement builder.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    slots: [Option<ExprBuilder>; 3],
}

impl InsertBuilder {
    fn new(table: ExprBuilder) -> Self {
        let mut slots: [Option<ExprBuilder>; 3] = Default::default();
        slots[InsertSlot::Table as usize] = Some(table);
        Self { slots }
    }

    fn slot(&mut self, slot: InsertSlot, kind: NodeKind) -> &mut ExprBuilder {
        self.slots[slot as usize].get_or_insert_with(|| ExprBuilder::leaf(kind))
    }

    /// Add a target column.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.slot(InsertSlot::Columns, NodeKind::Columns)
            .push(SqlBuilder::column(name));
        self
    }

    /// Add a value for the next column.
    pub fn value(mut self, expr: impl Into<ExprBuilder>) -> Self {
        self.slot(InsertSlot::Values, NodeKind::Values)
            .push(expr.into());
        self
    }

    pub fn build(self) -> Result<SqlTree> {
        let count = |slot: InsertSlot| {
            self.slots[slot as usize]
                .as_ref()
                .map_or(0, |s| s.children.len())
        };
        let columns = count(InsertSlot::Columns);
        if columns == 0 {
            return Err(missing("column list", "INSERT"));
        }
        let values = count(InsertSlot::Values);
        if values != columns {
            return Err(Error::builder(
                BuilderErrorKind::MissingClause,
                format!("INSERT has {columns} columns but {values} values"),
            ));
        }
        Ok(finish(assemble(NodeKind::Insert, self.slots)))
    }
}

#[derive(Debug, Clone, Copy)]
enum UpdateSlot {
    Table,
    Set,
    Where,
}

/// UPDATE statement builder.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    slots: [Option<ExprBuilder>; 3],
}

impl UpdateBuilder {
    fn new(table: ExprBuilder) -> Self {
        let mut slots: [Option<ExprBuilder>; 3] = Default::default();
        slots[UpdateSlot::Table as usize] = Some(table);
        Self { slots }
    }

    fn slot(&mut self, slot: UpdateSlot, kind: NodeKind) -> &mut ExprBuilder {
        self.slots[slot as usize].get_or_insert_with(|| ExprBuilder::leaf(kind))
    }

    /// Add `column = expr` to the SET clause.
    pub fn set(mut self, column: impl Into<String>, expr: impl Into<ExprBuilder>) -> Self {
        let assignment = ExprBuilder::with_children(
            NodeKind::Assignment,
            vec![SqlBuilder::column(column), expr.into()],
        );
        self.slot(UpdateSlot::Set, NodeKind::Set).push(assignment);
        self
    }

    /// Add a WHERE condition. Repeated calls are ANDed.
    pub fn where_(mut self, condition: ExprBuilder) -> Self {
        and_into(self.slot(UpdateSlot::Where, NodeKind::Where), condition);
        self
    }

    pub fn build(self) -> Result<SqlTree> {
        if self.slots[UpdateSlot::Set as usize].is_none() {
            return Err(missing("SET", "UPDATE"));
        }
        Ok(finish(assemble(NodeKind::Update, self.slots)))
    }
}

#[derive(Debug, Clone, Copy)]
enum DeleteSlot {
    Table,
    Where,
}

/// DELETE statement builder.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    slots: [Option<ExprBuilder>; 2],
}

impl DeleteBuilder {
    fn new(table: ExprBuilder) -> Self {
        let mut slots: [Option<ExprBuilder>; 2] = Default::default();
        slots[DeleteSlot::Table as usize] = Some(table);
        Self { slots }
    }

    /// Add a WHERE condition. Repeated calls are ANDed.
    pub fn where_(mut self, condition: ExprBuilder) -> Self {
        let clause = self.slots[DeleteSlot::Where as usize]
            .get_or_insert_with(|| ExprBuilder::leaf(NodeKind::Where));
        and_into(clause, condition);
        self
    }

    pub fn build(self) -> Result<SqlTree> {
        Ok(finish(assemble(NodeKind::Delete, self.slots)))
    }
}
