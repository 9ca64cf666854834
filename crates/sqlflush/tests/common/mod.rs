//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use sqlflush::prelude::*;
use std::sync::Arc;

/// gallery <- artist <- painting, artist.mentor -> artist, painting has a
/// version lock and a soft delete flag.
pub fn museum() -> Arc<EntityResolver> {
    let mut resolver = EntityResolver::new();
    resolver
        .register(
            DbEntity::new("painting")
                .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key().generated())
                .with_attribute(DbAttribute::new("title", SqlType::VarChar(200)).mandatory())
                .with_attribute(DbAttribute::new("artist_id", SqlType::BigInt))
                .with_attribute(DbAttribute::new("version", SqlType::Integer).lock())
                .with_attribute(DbAttribute::new("deleted", SqlType::Boolean))
                .with_relationship(DbRelationship::to_one(
                    "artist",
                    "artist",
                    vec![DbJoin::new("artist_id", "id")],
                )),
        )
        .unwrap();
    resolver
        .register(
            DbEntity::new("artist")
                .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key().generated())
                .with_attribute(DbAttribute::new("name", SqlType::Text))
                .with_attribute(DbAttribute::new("gallery_id", SqlType::BigInt))
                .with_attribute(DbAttribute::new("mentor_id", SqlType::BigInt))
                .with_relationship(DbRelationship::to_one(
                    "gallery",
                    "gallery",
                    vec![DbJoin::new("gallery_id", "id")],
                ))
                .with_relationship(DbRelationship::to_one(
                    "mentor",
                    "artist",
                    vec![DbJoin::new("mentor_id", "id")],
                ))
                .with_relationship(DbRelationship::to_many(
                    "paintings",
                    "painting",
                    vec![DbJoin::new("id", "artist_id")],
                )),
        )
        .unwrap();
    resolver
        .register(
            DbEntity::new("gallery")
                .with_attribute(DbAttribute::new("id", SqlType::BigInt).primary_key().generated())
                .with_attribute(DbAttribute::new("name", SqlType::Text)),
        )
        .unwrap();
    resolver.validate().unwrap();
    Arc::new(resolver)
}

pub fn entity(resolver: &EntityResolver, name: &str) -> Arc<DbEntity> {
    resolver.require(name).unwrap()
}

pub fn insert(resolver: &EntityResolver, name: &str, id: &ObjectId, values: Values) -> DbRowOp {
    DbRowOp::insert(entity(resolver, name), id.clone(), values)
}

pub fn delete(resolver: &EntityResolver, name: &str, key: i64) -> DbRowOp {
    let id = ObjectId::of(name, "id", key);
    DbRowOp::delete(entity(resolver, name), id.clone(), Qualifier::from_id(&id))
}

pub fn update(resolver: &EntityResolver, name: &str, key: i64, values: Values) -> DbRowOp {
    let id = ObjectId::of(name, "id", key);
    DbRowOp::update(entity(resolver, name), id.clone(), values, Qualifier::from_id(&id))
}

/// One executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub attributes: Vec<String>,
    pub values: Vec<Value>,
}

/// Executor that records every row and hands out sequential keys.
#[derive(Debug)]
pub struct RecordingExecutor {
    pub executed: Vec<Executed>,
    pub next_key: i64,
    pub affected: u64,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self {
            executed: Vec::new(),
            next_key: 100,
            affected: 1,
        }
    }
}

impl RecordingExecutor {
    pub fn sql(&self) -> Vec<&str> {
        self.executed.iter().map(|e| e.sql.as_str()).collect()
    }
}

impl BatchExecutor for RecordingExecutor {
    fn execute_row(
        &mut self,
        sql: &str,
        bindings: &[DbAttributeBinding],
        want_generated_keys: bool,
    ) -> Result<RowResult> {
        self.executed.push(Executed {
            sql: sql.to_string(),
            attributes: bindings.iter().map(|b| b.attribute.clone()).collect(),
            values: bindings.iter().map(|b| b.value.clone()).collect(),
        });
        let mut result = RowResult::affected(self.affected);
        if want_generated_keys {
            self.next_key += 1;
            result = result.with_key("id", self.next_key);
        }
        Ok(result)
    }
}
