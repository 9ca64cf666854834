//! CASE WHEN builders.
//!
//! The builder alternates between two types: [`CaseWhenBuilder`] accepts a
//! new WHEN or an ELSE, while [`WhenBuilder`] only accepts the THEN for the
//! pending condition. A CASE can therefore only be finished after every WHEN
//! has its THEN.

use crate::builder::ExprBuilder;
use crate::node::NodeKind;
use sqlflush_core::error::BuilderErrorKind;
use sqlflush_core::{Error, Result};

/// Builder for `CASE WHEN ... THEN ... [ELSE ...] END`.
#[derive(Debug, Clone, Default)]
pub struct CaseWhenBuilder {
    branches: Vec<(ExprBuilder, ExprBuilder)>,
    else_result: Option<ExprBuilder>,
}

impl CaseWhenBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a WHEN branch.
    pub fn when(self, condition: ExprBuilder) -> WhenBuilder {
        WhenBuilder {
            case: self,
            condition,
        }
    }

    /// Set the ELSE result, replacing a previous one.
    pub fn else_result(mut self, result: ExprBuilder) -> Self {
        self.else_result = Some(result);
        self
    }

    /// Finish the CASE expression.
    pub fn build(self) -> Result<ExprBuilder> {
        if self.branches.is_empty() {
            return Err(Error::builder(
                BuilderErrorKind::EmptyCase,
                "CASE requires at least one WHEN branch",
            ));
        }
        let mut children: Vec<ExprBuilder> = self
            .branches
            .into_iter()
            .map(|(condition, result)| {
                ExprBuilder::with_children(NodeKind::When, vec![condition, result])
            })
            .collect();
        if let Some(result) = self.else_result {
            children.push(ExprBuilder::with_children(NodeKind::Else, vec![result]));
        }
        Ok(ExprBuilder::with_children(NodeKind::Case, children))
    }
}

/// A WHEN waiting for its THEN.
#[derive(Debug, Clone)]
pub struct WhenBuilder {
    case: CaseWhenBuilder,
    condition: ExprBuilder,
}

impl WhenBuilder {
    /// Complete the pending branch.
    pub fn then(mut self, result: ExprBuilder) -> CaseWhenBuilder {
        self.case.branches.push((self.condition, result));
        self.case
    }

    /// Always fails: the pending WHEN has no THEN.
    pub fn build(self) -> Result<ExprBuilder> {
        Err(Error::builder(
            BuilderErrorKind::MissingThen,
            format!(
                "WHEN branch {} has no THEN",
                self.case.branches.len() + 1
            ),
        ))
    }
}
