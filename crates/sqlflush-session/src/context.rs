//! Per-flush state threaded through translation and execution.

use serde::Serialize;
use sqlflush_core::error::TranslationErrorKind;
use sqlflush_core::{Error, FlushConfig, ObjectId, Result, Value};
use std::collections::HashMap;

/// Counters collected while a flush executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushStats {
    /// Statements prepared (one per batch)
    pub statements: usize,
    /// Rows bound and handed to the executor
    pub rows_bound: usize,
    /// Rows whose generated keys were recorded
    pub generated_keys: usize,
}

/// State owned by a single flush.
///
/// Holds the key values the database generated for inserted rows. Deferred
/// foreign keys of later rows resolve against them, so a child inserted after
/// its parent binds the parent's real key.
#[derive(Debug, Clone)]
pub struct FlushContext {
    config: FlushConfig,
    replacements: HashMap<ObjectId, Vec<(String, Value)>>,
    stats: FlushStats,
}

impl FlushContext {
    pub fn new(config: FlushConfig) -> Self {
        Self {
            config,
            replacements: HashMap::new(),
            stats: FlushStats::default(),
        }
    }

    pub fn config(&self) -> &FlushConfig {
        &self.config
    }

    /// Record key values generated for the row `id`.
    pub fn record_generated_keys(&mut self, id: &ObjectId, keys: Vec<(String, Value)>) {
        tracing::trace!(id = %id, keys = keys.len(), "Recording generated keys");
        let entry = self.replacements.entry(id.clone()).or_default();
        for (attribute, value) in keys {
            match entry.iter_mut().find(|(name, _)| *name == attribute) {
                Some((_, slot)) => *slot = value,
                None => entry.push((attribute, value)),
            }
        }
        self.stats.generated_keys += 1;
    }

    /// Generated key values recorded for `id`.
    pub fn replacement(&self, id: &ObjectId) -> Option<&[(String, Value)]> {
        self.replacements.get(id).map(Vec::as_slice)
    }

    /// Current value of key attribute `attribute` of row `id`: a generated
    /// value if one was recorded, else the id's own key.
    pub fn resolve(&self, id: &ObjectId, attribute: &str) -> Result<Value> {
        let generated = self
            .replacements
            .get(id)
            .and_then(|keys| keys.iter().find(|(name, _)| name == attribute))
            .map(|(_, value)| value);
        generated
            .or_else(|| id.key_value(attribute))
            .cloned()
            .ok_or_else(|| {
                Error::translation(
                    TranslationErrorKind::UnresolvedValue,
                    Some(id.entity()),
                    format!("no value for '{attribute}' of {id}"),
                )
            })
    }

    pub fn stats(&self) -> FlushStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut FlushStats {
        &mut self.stats
    }
}
