//! Oracle rewrites (12c row limiting syntax).

use super::{
    SqlTreeProcessor, boolean_to_int, fetch_clause, is_function, limit_offset, rename_and_swap,
    rename_function, replace_with_text,
};
use crate::node::{NodeId, SqlTree};

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleProcessor;

impl SqlTreeProcessor for OracleProcessor {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn on_limit_offset_node(&self, tree: &mut SqlTree, id: NodeId) {
        let (limit, offset) = limit_offset(tree, id);
        replace_with_text(tree, id, fetch_clause(limit, offset, "NEXT"));
    }

    fn on_function_node(&self, tree: &mut SqlTree, id: NodeId) {
        if is_function(tree, id, "SUBSTRING") {
            rename_function(tree, id, "SUBSTR");
        } else if is_function(tree, id, "LOCATE") {
            rename_and_swap(tree, id, "INSTR");
        }
    }

    fn on_value_node(&self, tree: &mut SqlTree, id: NodeId) {
        boolean_to_int(tree, id);
    }
}
