//! Dialect-specific SQL tree rewrites.
//!
//! A processor walks the tree once, in pre-order, and hands every limit,
//! function, column, value and operator node to the matching hook. Hooks may
//! change the node in place, turn it into a different kind of node, or splice
//! nodes into its parent. Anything a dialect does not override passes
//! through untouched.

mod db2;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;

pub use db2::Db2Processor;
pub use mysql::MysqlProcessor;
pub use oracle::OracleProcessor;
pub use postgres::PostgresProcessor;
pub use sqlite::SqliteProcessor;
pub use sqlserver::SqlServerProcessor;

use crate::node::{NodeId, NodeKind, Operator, SqlTree};
use sqlflush_core::{Dialect, Value};

/// Rewrites a dialect-neutral tree for one database.
pub trait SqlTreeProcessor {
    /// Dialect family name used in logs.
    fn name(&self) -> &'static str;

    /// Visit every reachable node in pre-order.
    ///
    /// Nodes added by a hook are not visited; nodes detached by a hook are
    /// skipped.
    fn process(&self, tree: &mut SqlTree) {
        for id in tree.preorder() {
            if !tree.is_attached(id) {
                continue;
            }
            match tree.kind(id) {
                NodeKind::LimitOffset { .. } => self.on_limit_offset_node(tree, id),
                NodeKind::Function { .. } => self.on_function_node(tree, id),
                NodeKind::Column { .. } => self.on_column_node(tree, id),
                NodeKind::Value { .. } => self.on_value_node(tree, id),
                NodeKind::Operator { .. } => self.on_operator_node(tree, id),
                _ => {}
            }
        }
        tracing::trace!(processor = self.name(), nodes = tree.len(), "Processed SQL tree");
    }

    fn on_limit_offset_node(&self, _tree: &mut SqlTree, _id: NodeId) {}

    fn on_function_node(&self, _tree: &mut SqlTree, _id: NodeId) {}

    fn on_column_node(&self, _tree: &mut SqlTree, _id: NodeId) {}

    fn on_value_node(&self, _tree: &mut SqlTree, _id: NodeId) {}

    fn on_operator_node(&self, _tree: &mut SqlTree, _id: NodeId) {}
}

/// Pass-through processor for dialects that need no rewrites.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessor;

impl SqlTreeProcessor for DefaultProcessor {
    fn name(&self) -> &'static str {
        "default"
    }
}

/// The processor for a dialect.
pub fn processor_for(dialect: Dialect) -> Box<dyn SqlTreeProcessor> {
    match dialect {
        Dialect::Postgres => Box::new(PostgresProcessor),
        Dialect::H2 | Dialect::Hsqldb => Box::new(DefaultProcessor),
        Dialect::Mysql | Dialect::Mariadb => Box::new(MysqlProcessor),
        Dialect::Sqlite => Box::new(SqliteProcessor),
        Dialect::SqlServer | Dialect::Sybase => Box::new(SqlServerProcessor),
        Dialect::Oracle => Box::new(OracleProcessor),
        Dialect::Db2 | Dialect::Derby => Box::new(Db2Processor::new(dialect)),
    }
}

// ==================== Shared Rewrites ====================

/// Whether `id` is a function called `name` (case-insensitive).
pub(crate) fn is_function(tree: &SqlTree, id: NodeId, name: &str) -> bool {
    matches!(tree.kind(id), NodeKind::Function { name: n, .. } if n.eq_ignore_ascii_case(name))
}

/// Rename a function node.
pub(crate) fn rename_function(tree: &mut SqlTree, id: NodeId, to: &str) {
    if let NodeKind::Function { name, .. } = tree.kind_mut(id) {
        tracing::trace!(from = %name, to, "Renamed function");
        *name = to.to_string();
    }
}

/// Rename a function node and swap its two arguments, for
/// `LOCATE(needle, haystack)` style rewrites.
pub(crate) fn rename_and_swap(tree: &mut SqlTree, id: NodeId, to: &str) {
    rename_function(tree, id, to);
    if tree.children(id).len() >= 2 {
        tree.swap_children(id, 0, 1);
    }
}

/// Turn a function call into an infix operator over its arguments. A
/// function alias moves to an aliased node wrapping the operator.
pub(crate) fn function_to_operator(tree: &mut SqlTree, id: NodeId, op: Operator) {
    let NodeKind::Function { alias, .. } = tree.kind_mut(id) else {
        return;
    };
    let alias = alias.take();
    tree.replace(id, NodeKind::Operator { op });
    if let Some(alias) = alias {
        let aliased = tree.add(NodeKind::Aliased { alias });
        tree.substitute(id, aliased);
        tree.append_child(aliased, id);
    }
    tracing::trace!(op = op.as_str(), "Rewrote function as operator");
}

/// Limit and offset of a limit/offset node.
pub(crate) fn limit_offset(tree: &SqlTree, id: NodeId) -> (Option<u64>, Option<u64>) {
    match tree.kind(id) {
        NodeKind::LimitOffset { limit, offset } => (*limit, offset.filter(|&o| o > 0)),
        _ => (None, None),
    }
}

/// Replace a limit/offset node with literal SQL, or drop it when `sql` is empty.
pub(crate) fn replace_with_text(tree: &mut SqlTree, id: NodeId, sql: String) {
    if sql.is_empty() {
        tree.detach(id);
    } else {
        tree.replace(id, NodeKind::Text(sql));
    }
}

/// `OFFSET m ROWS FETCH <verb> n ROWS ONLY`, the SQL:2008 row limiting clause.
pub(crate) fn fetch_clause(limit: Option<u64>, offset: Option<u64>, verb: &str) -> String {
    let mut parts = Vec::new();
    if let Some(offset) = offset {
        parts.push(format!("OFFSET {offset} ROWS"));
    }
    if let Some(limit) = limit {
        parts.push(format!("FETCH {verb} {limit} ROWS ONLY"));
    }
    parts.join(" ")
}

/// Replace a boolean value with `1` / `0`.
pub(crate) fn boolean_to_int(tree: &mut SqlTree, id: NodeId) {
    if let NodeKind::Value { value, .. } = tree.kind_mut(id) {
        if let Value::Bool(b) = *value {
            *value = Value::SmallInt(i16::from(b));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlBuilder;
    use crate::generator::SqlGenerator;

    fn render(dialect: Dialect, tree: crate::node::SqlTree) -> String {
        let mut tree = tree;
        processor_for(dialect).process(&mut tree);
        SqlGenerator::new(dialect).generate(&tree).unwrap().sql
    }

    #[test]
    fn test_default_processor_passes_through() {
        let tree = SqlBuilder::select([SqlBuilder::function(
            "LENGTH",
            [SqlBuilder::column("name")],
        )])
        .from(SqlBuilder::table("artist"))
        .limit(5)
        .build()
        .unwrap();
        assert_eq!(
            render(Dialect::H2, tree),
            "SELECT LENGTH(name) FROM artist LIMIT 5"
        );
    }

    #[test]
    fn test_custom_column_hook() {
        struct Upper;
        impl SqlTreeProcessor for Upper {
            fn name(&self) -> &'static str {
                "upper"
            }
            fn on_column_node(&self, tree: &mut SqlTree, id: NodeId) {
                if let NodeKind::Column { name, .. } = tree.kind_mut(id) {
                    *name = name.to_uppercase();
                }
            }
        }

        let mut tree = SqlBuilder::select([SqlBuilder::column("name")])
            .from(SqlBuilder::table("artist"))
            .build()
            .unwrap();
        Upper.process(&mut tree);
        let sql = SqlGenerator::new(Dialect::Postgres)
            .generate(&tree)
            .unwrap()
            .sql;
        assert_eq!(sql, "SELECT NAME FROM artist");
    }

    #[test]
    fn test_function_to_operator_keeps_alias() {
        let mut tree = SqlBuilder::select([
            SqlBuilder::function("MOD", [SqlBuilder::column("a"), SqlBuilder::text("2")])
                .as_alias("m"),
            SqlBuilder::function("MOD", [SqlBuilder::column("b"), SqlBuilder::text("3")]),
        ])
        .build()
        .unwrap();
        let calls: Vec<_> = tree
            .preorder()
            .into_iter()
            .filter(|&id| is_function(&tree, id, "MOD"))
            .collect();
        for id in calls {
            function_to_operator(&mut tree, id, Operator::Mod);
        }
        let sql = SqlGenerator::new(Dialect::Postgres)
            .generate(&tree)
            .unwrap()
            .sql;
        assert_eq!(sql, "SELECT (a % 2) AS m, b % 3");
    }

    #[test]
    fn test_fetch_clause() {
        assert_eq!(
            fetch_clause(Some(10), Some(20), "NEXT"),
            "OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(fetch_clause(Some(10), None, "FIRST"), "FETCH FIRST 10 ROWS ONLY");
        assert_eq!(fetch_clause(None, None, "FIRST"), "");
    }
}
