//! MySQL and MariaDB rewrites.

use super::{SqlTreeProcessor, is_function, limit_offset, rename_function, replace_with_text};
use crate::node::{NodeId, NodeKind, Operator, SqlTree};

/// Largest row count MySQL accepts, used for offset-only queries.
const MAX_ROWS: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlProcessor;

impl SqlTreeProcessor for MysqlProcessor {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn on_limit_offset_node(&self, tree: &mut SqlTree, id: NodeId) {
        let sql = match limit_offset(tree, id) {
            (Some(limit), Some(offset)) => format!("LIMIT {offset}, {limit}"),
            (Some(limit), None) => format!("LIMIT {limit}"),
            (None, Some(offset)) => format!("LIMIT {offset}, {MAX_ROWS}"),
            (None, None) => String::new(),
        };
        replace_with_text(tree, id, sql);
    }

    fn on_function_node(&self, tree: &mut SqlTree, id: NodeId) {
        if is_function(tree, id, "LENGTH") {
            rename_function(tree, id, "CHAR_LENGTH");
        }
    }

    fn on_operator_node(&self, tree: &mut SqlTree, id: NodeId) {
        // `||` is logical OR in MySQL
        if tree.kind(id) == &(NodeKind::Operator { op: Operator::Concat }) {
            tree.replace(
                id,
                NodeKind::Function {
                    name: "CONCAT".to_string(),
                    aggregate: false,
                    alias: None,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlBuilder;
    use crate::generator::SqlGenerator;
    use sqlflush_core::Dialect;

    fn render(tree: SqlTree) -> String {
        let mut tree = tree;
        MysqlProcessor.process(&mut tree);
        SqlGenerator::new(Dialect::Mysql).generate(&tree).unwrap().sql
    }

    #[test]
    fn test_limit_offset_form() {
        let tree = SqlBuilder::select_all()
            .from(SqlBuilder::table("t"))
            .limit(10)
            .offset(20)
            .build()
            .unwrap();
        assert_eq!(render(tree), "SELECT * FROM t LIMIT 20, 10");
    }

    #[test]
    fn test_concat_operator_becomes_function() {
        let tree = SqlBuilder::select([SqlBuilder::column("a")
            .concat(SqlBuilder::column("b"))
            .concat(SqlBuilder::column("c"))])
        .build()
        .unwrap();
        assert_eq!(render(tree), "SELECT CONCAT(a, b, c)");
    }

    #[test]
    fn test_length_becomes_char_length() {
        let tree = SqlBuilder::select([SqlBuilder::function(
            "LENGTH",
            [SqlBuilder::column("name")],
        )])
        .build()
        .unwrap();
        assert_eq!(render(tree), "SELECT CHAR_LENGTH(name)");
    }
}
