//! SQL Server and Sybase rewrites.
//!
//! Neither database supports `LIMIT`. On the outermost statement the row cap
//! becomes a `TOP n` clause covering limit plus offset, and the offset is
//! skipped by the application after fetching (see [`SqlTree::fetch_offset`]).
//! A subquery with an offset has no caller to skip rows for it, so it gets an
//! `OFFSET ... FETCH NEXT` clause instead.

use super::{
    SqlTreeProcessor, boolean_to_int, fetch_clause, function_to_operator, is_function,
    limit_offset, rename_function,
};
use crate::node::{NodeId, NodeKind, Operator, SqlTree};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerProcessor;

impl SqlTreeProcessor for SqlServerProcessor {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn on_limit_offset_node(&self, tree: &mut SqlTree, id: NodeId) {
        let (limit, offset) = limit_offset(tree, id);
        let Some(select) = tree.find_ancestor(id, |k| matches!(k, NodeKind::Select)) else {
            tree.detach(id);
            return;
        };
        let nested = tree.parent(select).is_some();
        if nested && offset.is_some() {
            // OFFSET is only accepted after an ORDER BY
            if tree.find_child(select, |k| matches!(k, NodeKind::OrderBy)).is_none() {
                let index = tree.position(id).unwrap_or(0);
                let order = tree.add(NodeKind::Text("ORDER BY (SELECT NULL)".to_string()));
                tree.insert_child(select, index, order);
            }
            tree.replace(id, NodeKind::Text(fetch_clause(limit, offset, "NEXT")));
            tracing::trace!(?limit, ?offset, "Rewrote subquery LIMIT/OFFSET as OFFSET/FETCH");
            return;
        }
        tree.detach(id);

        if let Some(limit) = limit {
            let count = limit.saturating_add(offset.unwrap_or(0));
            let index = tree
                .find_child(select, |k| matches!(k, NodeKind::Distinct))
                .and_then(|d| tree.position(d))
                .map_or(0, |p| p + 1);
            let top = tree.add(NodeKind::Top { count });
            tree.insert_child(select, index, top);
        }
        if !nested {
            tree.fetch_offset = offset;
        }
        tracing::trace!(?limit, ?offset, "Rewrote LIMIT/OFFSET as TOP");
    }

    fn on_function_node(&self, tree: &mut SqlTree, id: NodeId) {
        if is_function(tree, id, "LENGTH") {
            rename_function(tree, id, "LEN");
        } else if is_function(tree, id, "LOCATE") {
            rename_function(tree, id, "CHARINDEX");
        } else if is_function(tree, id, "CURRENT_TIMESTAMP") {
            rename_function(tree, id, "GETDATE");
        } else if is_function(tree, id, "MOD") && tree.children(id).len() == 2 {
            function_to_operator(tree, id, Operator::Mod);
        }
    }

    fn on_value_node(&self, tree: &mut SqlTree, id: NodeId) {
        boolean_to_int(tree, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ExprBuilder, SqlBuilder};
    use crate::generator::SqlGenerator;
    use sqlflush_core::{Dialect, Value};

    fn process(tree: SqlTree) -> SqlTree {
        let mut tree = tree;
        SqlServerProcessor.process(&mut tree);
        tree
    }

    #[test]
    fn test_top_injected_after_distinct() {
        let tree = process(
            SqlBuilder::select([SqlBuilder::column("name")])
                .distinct()
                .from(SqlBuilder::table("artist"))
                .limit(10)
                .offset(5)
                .build()
                .unwrap(),
        );
        let stmt = SqlGenerator::new(Dialect::SqlServer).generate(&tree).unwrap();
        assert_eq!(stmt.sql, "SELECT DISTINCT TOP 15 name FROM artist");
        assert_eq!(stmt.fetch_offset, Some(5));
    }

    #[test]
    fn test_top_first_without_distinct() {
        let tree = process(
            SqlBuilder::select_all()
                .from(SqlBuilder::table("artist"))
                .limit(3)
                .build()
                .unwrap(),
        );
        let kinds: Vec<_> = tree
            .children(tree.root())
            .iter()
            .map(|&c| tree.kind(c).name())
            .collect();
        assert_eq!(kinds, vec!["top", "result", "from"]);
        assert_eq!(tree.fetch_offset, None);
    }

    #[test]
    fn test_offset_without_limit_is_fetch_offset_only() {
        let tree = process(
            SqlBuilder::select_all()
                .from(SqlBuilder::table("artist"))
                .offset(7)
                .build()
                .unwrap(),
        );
        let stmt = SqlGenerator::new(Dialect::SqlServer).generate(&tree).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM artist");
        assert_eq!(stmt.fetch_offset, Some(7));
    }

    #[test]
    fn test_subquery_offset_uses_fetch_clause() {
        let page = || {
            SqlBuilder::select([SqlBuilder::column("artist_id")])
                .from(SqlBuilder::table("painting"))
                .limit(10)
                .offset(20)
        };
        let tree = process(
            SqlBuilder::select([SqlBuilder::column("name")])
                .from(SqlBuilder::table("artist"))
                .where_(SqlBuilder::exists(page()).unwrap())
                .where_(SqlBuilder::exists(page().order_by(SqlBuilder::column("title"))).unwrap())
                .build()
                .unwrap(),
        );
        let stmt = SqlGenerator::new(Dialect::SqlServer).generate(&tree).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT name FROM artist WHERE EXISTS (SELECT artist_id FROM painting \
             ORDER BY (SELECT NULL) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY) \
             AND EXISTS (SELECT artist_id FROM painting \
             ORDER BY title ASC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY)"
        );
        assert_eq!(stmt.fetch_offset, None);
    }

    #[test]
    fn test_subquery_limit_without_offset_keeps_top() {
        let sub = SqlBuilder::select([SqlBuilder::column("id")])
            .from(SqlBuilder::table("painting"))
            .limit(3);
        let tree = process(
            SqlBuilder::select_all()
                .from(SqlBuilder::table("artist"))
                .where_(SqlBuilder::exists(sub).unwrap())
                .offset(4)
                .build()
                .unwrap(),
        );
        let stmt = SqlGenerator::new(Dialect::SqlServer).generate(&tree).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM artist WHERE EXISTS (SELECT TOP 3 id FROM painting)"
        );
        assert_eq!(stmt.fetch_offset, Some(4));
    }

    #[test]
    fn test_mod_keeps_function_alias() {
        let tree = process(
            SqlBuilder::select([SqlBuilder::function(
                "MOD",
                [SqlBuilder::column("a"), SqlBuilder::text("2")],
            )
            .as_alias("m")])
            .from(SqlBuilder::table("t"))
            .build()
            .unwrap(),
        );
        let stmt = SqlGenerator::new(Dialect::SqlServer).generate(&tree).unwrap();
        assert_eq!(stmt.sql, "SELECT (a % 2) AS m FROM t");
    }

    #[test]
    fn test_functions_and_booleans() {
        let tree = process(
            SqlBuilder::select([
                SqlBuilder::function("LENGTH", [SqlBuilder::column("a")]),
                SqlBuilder::function("MOD", [SqlBuilder::column("a"), SqlBuilder::text("2")]),
                SqlBuilder::function("CURRENT_TIMESTAMP", Vec::<ExprBuilder>::new()),
            ])
            .where_(SqlBuilder::column("active").eq(true))
            .build()
            .unwrap(),
        );
        let stmt = SqlGenerator::new(Dialect::SqlServer).generate(&tree).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT LEN(a), a % 2, GETDATE() WHERE active = ?"
        );
        assert_eq!(stmt.params[0].value, Value::SmallInt(1));
    }
}
