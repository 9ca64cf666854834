//! Table-level mapping metadata consumed by the flush engine.
//!
//! Entities are built in code; loading them from mapping files is out of
//! scope for this crate.

use crate::error::{Error, MappingErrorKind, Result};
use crate::types::SqlType;
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata about a mapped column.
#[derive(Debug, Clone, PartialEq)]
pub struct DbAttribute {
    /// Column name
    pub name: String,
    /// SQL type used for binding conversion
    pub sql_type: SqlType,
    /// Whether this is part of the primary key
    pub primary_key: bool,
    /// Whether the database generates the value (identity, serial, ...)
    pub generated: bool,
    /// Whether the column is NOT NULL
    pub mandatory: bool,
    /// Whether the column takes part in optimistic locking
    pub lock: bool,
}

impl DbAttribute {
    /// Create a new attribute with the given column name and type.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            primary_key: false,
            generated: false,
            mandatory: false,
            lock: false,
        }
    }

    /// Mark as (part of) the primary key. Implies mandatory.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.mandatory = true;
        self
    }

    /// Mark as database-generated.
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Mark as NOT NULL.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Include in the optimistic locking qualifier.
    pub fn lock(mut self) -> Self {
        self.lock = true;
        self
    }
}

/// One column pair of a relationship join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbJoin {
    /// Column on the source entity
    pub source: String,
    /// Column on the target entity
    pub target: String,
}

impl DbJoin {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// A relationship between two tables.
#[derive(Debug, Clone, PartialEq)]
pub struct DbRelationship {
    /// Relationship name
    pub name: String,
    /// Target entity name
    pub target_entity: String,
    /// Join columns
    pub joins: Vec<DbJoin>,
    /// Whether the relationship points at many target rows
    pub to_many: bool,
    /// Whether the target's primary key is derived from the source's
    pub to_dependent_pk: bool,
}

impl DbRelationship {
    /// A to-one relationship: source columns reference the target.
    pub fn to_one(
        name: impl Into<String>,
        target_entity: impl Into<String>,
        joins: Vec<DbJoin>,
    ) -> Self {
        Self {
            name: name.into(),
            target_entity: target_entity.into(),
            joins,
            to_many: false,
            to_dependent_pk: false,
        }
    }

    /// A to-many relationship: target columns reference the source.
    pub fn to_many(
        name: impl Into<String>,
        target_entity: impl Into<String>,
        joins: Vec<DbJoin>,
    ) -> Self {
        Self {
            to_many: true,
            ..Self::to_one(name, target_entity, joins)
        }
    }

    /// Mark the target's primary key as dependent on the source.
    pub fn dependent_pk(mut self) -> Self {
        self.to_dependent_pk = true;
        self
    }

    /// Whether this relationship points back at `entity`.
    pub fn is_reflexive(&self, entity: &str) -> bool {
        self.target_entity == entity
    }
}

/// Which side of a relationship must be written first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Entity whose rows must exist first
    pub master: String,
    /// Entity whose rows reference the master
    pub dependent: String,
}

/// A mapped table.
#[derive(Debug, Clone, PartialEq)]
pub struct DbEntity {
    /// Table name
    pub name: String,
    attributes: Vec<DbAttribute>,
    relationships: Vec<DbRelationship>,
}

impl DbEntity {
    /// Create an entity with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, attribute: DbAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a relationship.
    pub fn with_relationship(mut self, relationship: DbRelationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// All attributes in declaration order.
    pub fn attributes(&self) -> &[DbAttribute] {
        &self.attributes
    }

    /// Look up an attribute by column name.
    pub fn attribute(&self, name: &str) -> Option<&DbAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Primary key attributes in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &DbAttribute> {
        self.attributes.iter().filter(|a| a.primary_key)
    }

    /// Optimistic locking attributes in declaration order.
    pub fn lock_attributes(&self) -> impl Iterator<Item = &DbAttribute> {
        self.attributes.iter().filter(|a| a.lock)
    }

    /// All relationships.
    pub fn relationships(&self) -> &[DbRelationship] {
        &self.relationships
    }

    /// Look up a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&DbRelationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// To-one relationships pointing back at this entity through a foreign key.
    pub fn reflexive_relationships(&self) -> impl Iterator<Item = &DbRelationship> {
        self.relationships
            .iter()
            .filter(|r| r.is_reflexive(&self.name) && !r.to_many && !self.joins_pk_only(r))
    }

    /// Whether rows of this table can reference other rows of the same table.
    pub fn is_reflexive(&self) -> bool {
        self.reflexive_relationships().next().is_some()
    }

    fn joins_pk_only(&self, relationship: &DbRelationship) -> bool {
        !relationship.joins.is_empty()
            && relationship
                .joins
                .iter()
                .all(|j| self.attribute(&j.source).is_some_and(|a| a.primary_key))
    }

    /// The ordering constraint a relationship imposes, if any.
    ///
    /// A to-one relationship over non-key columns makes this entity depend
    /// on the target. A to-many or dependent-PK relationship makes the
    /// target depend on this entity. PK-to-PK to-one joins without the
    /// dependent flag are described by their reverse side and yield `None`.
    pub fn dependency(&self, relationship: &DbRelationship) -> Option<Dependency> {
        if relationship.to_many || relationship.to_dependent_pk {
            return Some(Dependency {
                master: self.name.clone(),
                dependent: relationship.target_entity.clone(),
            });
        }
        if self.joins_pk_only(relationship) {
            return None;
        }
        Some(Dependency {
            master: relationship.target_entity.clone(),
            dependent: self.name.clone(),
        })
    }
}

/// Registry of mapped entities by name.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    entities: Vec<Arc<DbEntity>>,
    index: HashMap<String, usize>,
}

impl EntityResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity. Names must be unique.
    pub fn register(&mut self, entity: DbEntity) -> Result<Arc<DbEntity>> {
        if self.index.contains_key(&entity.name) {
            return Err(Error::mapping(
                MappingErrorKind::DuplicateEntity,
                format!("entity '{}' is already registered", entity.name),
            ));
        }
        tracing::trace!(
            entity = %entity.name,
            attributes = entity.attributes.len(),
            relationships = entity.relationships.len(),
            "Registering entity"
        );
        let entity = Arc::new(entity);
        self.index.insert(entity.name.clone(), self.entities.len());
        self.entities.push(Arc::clone(&entity));
        Ok(entity)
    }

    /// Look up an entity by name.
    pub fn entity(&self, name: &str) -> Option<Arc<DbEntity>> {
        self.index.get(name).map(|&i| Arc::clone(&self.entities[i]))
    }

    /// Look up an entity by name, failing if it is not registered.
    pub fn require(&self, name: &str) -> Result<Arc<DbEntity>> {
        self.entity(name).ok_or_else(|| {
            Error::mapping(
                MappingErrorKind::UnknownEntity,
                format!("entity '{}' is not registered", name),
            )
        })
    }

    /// Registered entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &Arc<DbEntity>> {
        self.entities.iter()
    }

    /// Check that every relationship points at a registered entity.
    pub fn validate(&self) -> Result<()> {
        for entity in &self.entities {
            for rel in entity.relationships() {
                if !self.index.contains_key(&rel.target_entity) {
                    return Err(Error::mapping(
                        MappingErrorKind::UnknownTarget,
                        format!(
                            "relationship '{}.{}' targets unknown entity '{}'",
                            entity.name, rel.name, rel.target_entity
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
