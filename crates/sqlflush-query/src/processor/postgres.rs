//! PostgreSQL rewrites.

use super::{SqlTreeProcessor, is_function, rename_and_swap};
use crate::node::{NodeId, SqlTree};

/// PostgreSQL has no `LOCATE`; `STRPOS` takes its arguments the other way round.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresProcessor;

impl SqlTreeProcessor for PostgresProcessor {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn on_function_node(&self, tree: &mut SqlTree, id: NodeId) {
        if is_function(tree, id, "LOCATE") {
            rename_and_swap(tree, id, "STRPOS");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlBuilder;
    use crate::generator::SqlGenerator;
    use sqlflush_core::Dialect;

    #[test]
    fn test_locate_becomes_strpos() {
        let mut tree = SqlBuilder::select([SqlBuilder::function(
            "locate",
            [SqlBuilder::text("'a'"), SqlBuilder::column("name")],
        )])
        .build()
        .unwrap();
        PostgresProcessor.process(&mut tree);
        let stmt = SqlGenerator::new(Dialect::Postgres).generate(&tree).unwrap();
        assert_eq!(stmt.sql, "SELECT STRPOS(name, 'a')");
    }
}
