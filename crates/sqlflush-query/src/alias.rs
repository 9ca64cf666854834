//! Alias suppression outside the result list.
//!
//! Aliases only belong in the SELECT result list. Expressions reused in
//! WHERE, GROUP BY, HAVING or ORDER BY, and arguments of functions, are
//! rendered without them.

use crate::node::{NodeId, NodeKind, SqlTree};

/// Clears column and function aliases where they must not render and unwraps
/// aliased expressions in the same positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppressAliasVisitor;

impl SuppressAliasVisitor {
    /// Walk the whole tree.
    pub fn visit(self, tree: &mut SqlTree) {
        let root = tree.root();
        self.walk(tree, root, false);
    }

    fn walk(self, tree: &mut SqlTree, id: NodeId, suppress: bool) {
        let mut id = id;
        if suppress {
            id = Self::strip(tree, id);
        }

        let suppress_children = match tree.kind(id) {
            NodeKind::Where | NodeKind::GroupBy | NodeKind::Having | NodeKind::OrderBy => true,
            NodeKind::Function { .. } => true,
            // a subquery has its own result list
            NodeKind::Select => false,
            _ => suppress,
        };

        let children = tree.children(id).to_vec();
        for child in children {
            self.walk(tree, child, suppress_children);
        }
    }

    /// Remove the alias from `id`, returning the node that now sits in its place.
    fn strip(tree: &mut SqlTree, id: NodeId) -> NodeId {
        if matches!(tree.kind(id), NodeKind::Aliased { .. }) {
            return match tree.child(id, 0) {
                Some(inner) => {
                    tree.substitute(id, inner);
                    tracing::trace!(node = %id, "Unwrapped aliased expression");
                    Self::strip(tree, inner)
                }
                None => id,
            };
        }
        if let NodeKind::Column { alias, .. } | NodeKind::Function { alias, .. } =
            tree.kind_mut(id)
        {
            if alias.take().is_some() {
                tracing::trace!(node = %id, "Suppressed alias");
            }
        }
        id
    }
}
