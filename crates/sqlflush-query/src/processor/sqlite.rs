//! SQLite rewrites.

use super::{
    SqlTreeProcessor, function_to_operator, is_function, limit_offset, rename_and_swap,
    rename_function, replace_with_text,
};
use crate::node::{NodeId, Operator, SqlTree};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteProcessor;

impl SqlTreeProcessor for SqliteProcessor {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn on_limit_offset_node(&self, tree: &mut SqlTree, id: NodeId) {
        // OFFSET is only valid after a LIMIT
        if let (None, Some(offset)) = limit_offset(tree, id) {
            replace_with_text(tree, id, format!("LIMIT -1 OFFSET {offset}"));
        }
    }

    fn on_function_node(&self, tree: &mut SqlTree, id: NodeId) {
        if is_function(tree, id, "SUBSTRING") {
            rename_function(tree, id, "SUBSTR");
        } else if is_function(tree, id, "LOCATE") {
            rename_and_swap(tree, id, "INSTR");
        } else if is_function(tree, id, "CONCAT") && tree.children(id).len() >= 2 {
            function_to_operator(tree, id, Operator::Concat);
        }
    }
}
