//! Arena-allocated SQL tree.
//!
//! Nodes live in a `Vec` owned by [`SqlTree`] and refer to each other by
//! [`NodeId`]. Every node records its parent index and an ordered list of
//! child indices, so rewrites can walk up to ancestors and splice siblings
//! without shared ownership. A node removed from its parent stays in the
//! arena but is no longer reachable from the root.

use sqlflush_core::Value;
use std::fmt;

/// Index of a node inside its [`SqlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operators rendered between their operands.
///
/// Operator nodes are n-ary: `a AND b AND c` is one node with three children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Logical AND
    And,
    /// Logical OR
    Or,
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Modulo (%)
    Mod,
    /// String concatenation (||)
    Concat,
}

impl Operator {
    /// Get the SQL representation of this operator.
    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Concat => "||",
        }
    }

    /// Get the precedence of this operator (higher = binds tighter).
    pub const fn precedence(self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Eq
            | Operator::Ne
            | Operator::Lt
            | Operator::Le
            | Operator::Gt
            | Operator::Ge => 3,
            Operator::Add | Operator::Sub | Operator::Concat => 4,
            Operator::Mul | Operator::Div | Operator::Mod => 5,
        }
    }
}

/// Join flavor in a FROM clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// What a node represents. Children are described per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // ==================== Statements ====================
    /// Clause nodes in canonical order
    Select,
    /// Table, Columns, Values
    Insert,
    /// Table, Set, optional Where
    Update,
    /// Table, optional Where
    Delete,

    // ==================== Clauses ====================
    Distinct,
    /// Row cap rendered right after SELECT / DISTINCT
    Top { count: u64 },
    /// Result expressions
    ResultList,
    /// Tables and joins
    From,
    /// Single condition
    Where,
    /// Grouping expressions
    GroupBy,
    /// Single condition
    Having,
    /// Sort nodes
    OrderBy,
    /// Row limit and offset, rewritten per dialect
    LimitOffset {
        limit: Option<u64>,
        offset: Option<u64>,
    },
    /// INSERT column list
    Columns,
    /// INSERT value list
    Values,
    /// UPDATE assignments
    Set,
    /// Column and new value
    Assignment,

    // ==================== Expressions ====================
    Table {
        name: String,
        alias: Option<String>,
    },
    /// Joined table and ON condition
    Join { kind: JoinKind },
    Column {
        table: Option<String>,
        name: String,
        alias: Option<String>,
    },
    /// Bound parameter; `attribute` marks a binding slot filled per row
    Value {
        value: Value,
        attribute: Option<String>,
    },
    /// `*`
    Star,
    /// Operands
    Operator { op: Operator },
    /// Negated operand
    Not,
    /// Arguments
    Function {
        name: String,
        aggregate: bool,
        alias: Option<String>,
    },
    /// Tested operand
    IsNull { negated: bool },
    /// Tested operand followed by the list
    InList { negated: bool },
    /// Operand, low, high
    Between,
    /// Operand, pattern
    Like { case_insensitive: bool },
    /// When nodes, optional Else
    Case,
    /// Condition, result
    When,
    /// Result
    Else,
    /// Subquery
    Exists,
    /// Wrapped expression rendered with an alias
    Aliased { alias: String },
    /// Sorted expression
    Sort { descending: bool },
    /// Raw SQL emitted verbatim
    Text(String),
}

impl NodeKind {
    /// Whether this is a statement root.
    pub const fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Select | NodeKind::Insert | NodeKind::Update | NodeKind::Delete
        )
    }

    /// Short name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeKind::Select => "select",
            NodeKind::Insert => "insert",
            NodeKind::Update => "update",
            NodeKind::Delete => "delete",
            NodeKind::Distinct => "distinct",
            NodeKind::Top { .. } => "top",
            NodeKind::ResultList => "result",
            NodeKind::From => "from",
            NodeKind::Where => "where",
            NodeKind::GroupBy => "group_by",
            NodeKind::Having => "having",
            NodeKind::OrderBy => "order_by",
            NodeKind::LimitOffset { .. } => "limit_offset",
            NodeKind::Columns => "columns",
            NodeKind::Values => "values",
            NodeKind::Set => "set",
            NodeKind::Assignment => "assignment",
            NodeKind::Table { .. } => "table",
            NodeKind::Join { .. } => "join",
            NodeKind::Column { .. } => "column",
            NodeKind::Value { .. } => "value",
            NodeKind::Star => "star",
            NodeKind::Operator { .. } => "operator",
            NodeKind::Not => "not",
            NodeKind::Function { .. } => "function",
            NodeKind::IsNull { .. } => "is_null",
            NodeKind::InList { .. } => "in",
            NodeKind::Between => "between",
            NodeKind::Like { .. } => "like",
            NodeKind::Case => "case",
            NodeKind::When => "when",
            NodeKind::Else => "else",
            NodeKind::Exists => "exists",
            NodeKind::Aliased { .. } => "aliased",
            NodeKind::Sort { .. } => "sort",
            NodeKind::Text(_) => "text",
        }
    }
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A SQL statement as an arena of nodes.
///
/// One tree is built per translation and is never shared between threads
/// or statements.
#[derive(Debug, Clone)]
pub struct SqlTree {
    nodes: Vec<Node>,
    root: NodeId,
    /// Rows the application must skip after fetching, for dialects that cannot
    /// express an offset in SQL.
    pub fetch_offset: Option<u64>,
}

impl SqlTree {
    /// Create a tree with a root node.
    pub fn new(root: NodeKind) -> Self {
        Self {
            nodes: vec![Node {
                kind: root,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            fetch_offset: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, including detached ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    /// Replace a node's kind, keeping its position and children.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) -> NodeKind {
        std::mem::replace(&mut self.nodes[id.0].kind, kind)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Child at `index`, if present.
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0].children.get(index).copied()
    }

    /// Allocate a detached node.
    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate a node and append it to `parent`.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.add(kind);
        self.append_child(parent, id);
        id
    }

    /// Append `child` to `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` at `index` among `parent`'s children.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Remove a node from its parent. The node and its subtree stay in the
    /// arena but are no longer rendered.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Put `replacement` where `id` currently sits and detach `id`.
    pub fn substitute(&mut self, id: NodeId, replacement: NodeId) {
        let Some(parent) = self.parent(id) else {
            if id == self.root {
                self.detach(replacement);
                self.root = replacement;
            }
            return;
        };
        let index = self.position(id).unwrap_or(0);
        self.detach(id);
        self.insert_child(parent, index, replacement);
    }

    /// Position of a node among its siblings.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Swap two children of the same node.
    pub fn swap_children(&mut self, parent: NodeId, a: usize, b: usize) {
        self.nodes[parent.0].children.swap(a, b);
    }

    /// Parent chain from the direct parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Nearest ancestor matching `pred`.
    pub fn find_ancestor(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|&a| pred(self.kind(a)))
    }

    /// First direct child matching `pred`.
    pub fn find_child(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| pred(self.kind(c)))
    }

    /// Reachable nodes in pre-order, starting at the root.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.preorder_from(self.root)
    }

    /// Nodes of the subtree rooted at `start` in pre-order.
    pub fn preorder_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }
}

/// Iterator over a node's ancestors.
pub struct Ancestors<'a> {
    tree: &'a SqlTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
