//! DB2 and Derby rewrites.

use super::{
    SqlTreeProcessor, boolean_to_int, fetch_clause, is_function, limit_offset, rename_function,
    replace_with_text,
};
use crate::node::{NodeId, SqlTree};
use sqlflush_core::Dialect;

#[derive(Debug, Clone, Copy)]
pub struct Db2Processor {
    dialect: Dialect,
}

impl Db2Processor {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }
}

impl SqlTreeProcessor for Db2Processor {
    fn name(&self) -> &'static str {
        self.dialect.as_str()
    }

    fn on_limit_offset_node(&self, tree: &mut SqlTree, id: NodeId) {
        let (limit, offset) = limit_offset(tree, id);
        replace_with_text(tree, id, fetch_clause(limit, offset, "FIRST"));
    }

    fn on_function_node(&self, tree: &mut SqlTree, id: NodeId) {
        if is_function(tree, id, "SUBSTRING") {
            rename_function(tree, id, "SUBSTR");
        }
    }

    fn on_value_node(&self, tree: &mut SqlTree, id: NodeId) {
        if !self.dialect.supports_native_booleans() {
            boolean_to_int(tree, id);
        }
    }
}
