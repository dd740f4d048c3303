//! Entity schemas and the schema registry.
//!
//! An [`EntitySchema`] is the validated column list of one entity. The
//! [`SchemaRegistry`] holds every schema of a process: it is built once at
//! startup with [`SchemaRegistry::register`], then frozen behind an `Arc` and
//! shared read-only by every request handler. There is no global state; the
//! registry is passed explicitly to whatever needs it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use quickcrud_core::{CrudError, CrudResult};

use crate::constraints::UniqueConstraint;
use crate::fields::ColumnSpec;
use crate::query::grammar::SLOT_SEPARATOR;
use crate::query::pagination::RESERVED_PARAMS;
use crate::value::Value;

/// Converts a column's default to the column's semantic type.
fn typed_default(entity: &str, mut column: ColumnSpec) -> CrudResult<ColumnSpec> {
    let Some(default) = column.default.take() else {
        return Ok(column);
    };
    if default.is_null() {
        column.default = Some(default);
        return Ok(column);
    }
    let typed = Value::from_json(&default.to_json(), column.semantic_type).ok_or_else(|| {
        CrudError::SchemaError(format!(
            "entity '{entity}': default {default} of column '{}' is not a valid {}",
            column.name, column.semantic_type
        ))
    })?;
    column.default = Some(typed);
    Ok(column)
}

/// The validated column list of one entity.
///
/// # Examples
///
/// ```
/// use quickcrud_db::fields::{ColumnSpec, SemanticType};
/// use quickcrud_db::registry::EntitySchema;
///
/// let schema = EntitySchema::new(
///     "test_table",
///     vec![
///         ColumnSpec::new("primary_key", SemanticType::Int64).primary_key(),
///         ColumnSpec::new("text_value", SemanticType::String),
///     ],
///     vec![],
/// )
/// .unwrap();
/// assert_eq!(schema.single_primary_key().unwrap().name, "primary_key");
/// assert!(schema.lookup("nope").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    columns: Vec<ColumnSpec>,
    unique_constraints: Vec<UniqueConstraint>,
    uniqueness_groups: Vec<UniqueConstraint>,
}

impl EntitySchema {
    /// Validates and builds a schema.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SchemaError`] if a column name is empty, repeated,
    /// reserved for pagination, or contains the filter slot separator; if no
    /// primary key exists or a key column is nullable; if `autoincrement` is
    /// set on a non-integer column; if a non-nullable column defaults to NULL;
    /// if a default is not a value of its column's type; or if a composite
    /// unique group is empty or references unknown columns.
    ///
    /// Defaults are normalized to the column's type (a `Float32` default is
    /// rounded to single precision, a date string becomes a date).
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnSpec>,
        unique_constraints: Vec<UniqueConstraint>,
    ) -> CrudResult<Self> {
        let name = name.into();
        let fail = |msg: String| Err(CrudError::SchemaError(format!("entity '{name}': {msg}")));

        if name.is_empty() {
            return Err(CrudError::SchemaError("entity name must not be empty".into()));
        }

        let columns = columns
            .into_iter()
            .map(|column| typed_default(&name, column))
            .collect::<CrudResult<Vec<_>>>()?;

        let mut seen = HashSet::new();
        for column in &columns {
            if column.name.is_empty() {
                return fail("column name must not be empty".into());
            }
            if !seen.insert(column.name.as_str()) {
                return fail(format!("duplicate column '{}'", column.name));
            }
            if RESERVED_PARAMS.contains(&column.name.as_str()) {
                return fail(format!("column name '{}' is reserved", column.name));
            }
            if column.name.contains(SLOT_SEPARATOR) {
                return fail(format!(
                    "column name '{}' must not contain '{SLOT_SEPARATOR}'",
                    column.name
                ));
            }
            if column.primary_key && column.nullable {
                return fail(format!("primary key column '{}' cannot be nullable", column.name));
            }
            if column.autoincrement && !column.semantic_type.is_integer() {
                return fail(format!(
                    "autoincrement column '{}' must be an integer, not {}",
                    column.name, column.semantic_type
                ));
            }
            if column.default == Some(Value::Null) && !column.nullable {
                return fail(format!(
                    "non-nullable column '{}' cannot default to NULL",
                    column.name
                ));
            }
        }

        let pk: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        if pk.is_empty() {
            return fail("no primary key column".into());
        }

        for constraint in &unique_constraints {
            if constraint.columns().is_empty() {
                return fail(format!("unique constraint '{}' has no columns", constraint.name()));
            }
            if let Some(unknown) = constraint.columns().iter().find(|c| !seen.contains(c.as_str())) {
                return fail(format!(
                    "unique constraint '{}' references unknown column '{unknown}'",
                    constraint.name()
                ));
            }
        }

        let mut uniqueness_groups = vec![UniqueConstraint::new(format!("{name}_pkey"), pk)];
        uniqueness_groups.extend(
            columns
                .iter()
                .filter(|c| c.unique && !c.primary_key)
                .map(|c| UniqueConstraint::new(format!("{name}_{}_key", c.name), vec![c.name.clone()])),
        );
        uniqueness_groups.extend(unique_constraints.iter().cloned());

        Ok(Self {
            name,
            columns,
            unique_constraints,
            uniqueness_groups,
        })
    }

    /// Returns the entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns in declaration order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Returns the declared composite unique constraints.
    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.unique_constraints
    }

    /// Every uniqueness rule of the entity: the primary key first, then
    /// single-column `unique` flags, then composite constraints.
    pub fn uniqueness_groups(&self) -> &[UniqueConstraint] {
        &self.uniqueness_groups
    }

    /// Returns the column with the given name, if any.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the column with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::UnknownColumn`] if the entity has no such column.
    pub fn lookup(&self, name: &str) -> CrudResult<&ColumnSpec> {
        self.column(name)
            .ok_or_else(|| CrudError::unknown_column(&self.name, name))
    }

    /// Returns the primary key columns in declaration order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Returns the primary key column when the key is a single column.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SchemaError`] for composite keys, which cannot be
    /// addressed by a single path segment.
    pub fn single_primary_key(&self) -> CrudResult<&ColumnSpec> {
        let mut keys = self.primary_key_columns();
        match (keys.next(), keys.next()) {
            (Some(pk), None) => Ok(pk),
            _ => Err(CrudError::SchemaError(format!(
                "entity '{}' has a composite primary key; single-resource operations need exactly one key column",
                self.name
            ))),
        }
    }
}

/// The process-wide collection of entity schemas.
///
/// Build it with [`register`](SchemaRegistry::register) during startup,
/// then share it with [`into_shared`](SchemaRegistry::into_shared).
///
/// # Examples
///
/// ```
/// use quickcrud_db::fields::{ColumnSpec, SemanticType};
/// use quickcrud_db::registry::SchemaRegistry;
///
/// let mut registry = SchemaRegistry::new();
/// registry
///     .register("users", vec![ColumnSpec::new("id", SemanticType::Int64).primary_key()])
///     .unwrap();
/// let registry = registry.into_shared();
/// assert!(registry.lookup("users", "id").is_ok());
/// assert!(registry.lookup("users", "email").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, Arc<EntitySchema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity from its columns.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SchemaError`] if the columns fail validation or
    /// the entity is already registered.
    pub fn register(&mut self, entity: impl Into<String>, columns: Vec<ColumnSpec>) -> CrudResult<()> {
        self.register_schema(EntitySchema::new(entity, columns, Vec::new())?)
    }

    /// Registers a pre-built schema.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::SchemaError`] if the entity is already registered.
    pub fn register_schema(&mut self, schema: EntitySchema) -> CrudResult<()> {
        if self.entities.contains_key(schema.name()) {
            return Err(CrudError::SchemaError(format!(
                "entity '{}' is already registered",
                schema.name()
            )));
        }
        tracing::debug!(entity = schema.name(), columns = schema.columns().len(), "Registered entity");
        self.entities.insert(schema.name().to_string(), Arc::new(schema));
        Ok(())
    }

    /// Freezes the registry for shared read-only use.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Returns the schema of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::NotFound`] for an unregistered entity.
    pub fn get(&self, entity: &str) -> CrudResult<Arc<EntitySchema>> {
        self.entities
            .get(entity)
            .cloned()
            .ok_or_else(|| CrudError::NotFound(format!("Unknown entity '{entity}'")))
    }

    /// Returns a column of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::NotFound`] for an unregistered entity and
    /// [`CrudError::UnknownColumn`] for an unknown column.
    pub fn lookup(&self, entity: &str, column: &str) -> CrudResult<ColumnSpec> {
        self.get(entity)?.lookup(column).cloned()
    }

    /// Returns the registered entity names in sorted order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Returns every registered schema in name order.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<EntitySchema>> {
        self.entities.values()
    }

    /// Returns the number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::SemanticType;

    fn pk() -> ColumnSpec {
        ColumnSpec::new("primary_key", SemanticType::Int64).primary_key()
    }

    fn schema_err(result: CrudResult<EntitySchema>) -> String {
        match result {
            Err(CrudError::SchemaError(msg)) => msg,
            other => panic!("expected SchemaError, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_schema() {
        let schema = EntitySchema::new(
            "t",
            vec![pk(), ColumnSpec::new("email", SemanticType::String).unique()],
            vec![],
        )
        .unwrap();
        assert_eq!(schema.name(), "t");
        assert_eq!(schema.columns().len(), 2);
        let groups: Vec<&str> = schema.uniqueness_groups().iter().map(UniqueConstraint::name).collect();
        assert_eq!(groups, vec!["t_pkey", "t_email_key"]);
    }

    #[test]
    fn test_duplicate_column() {
        let msg = schema_err(EntitySchema::new("t", vec![pk(), pk()], vec![]));
        assert!(msg.contains("duplicate column 'primary_key'"));
    }

    #[test]
    fn test_missing_primary_key() {
        let msg = schema_err(EntitySchema::new(
            "t",
            vec![ColumnSpec::new("a", SemanticType::Int32)],
            vec![],
        ));
        assert!(msg.contains("no primary key"));
    }

    #[test]
    fn test_composite_unique_unknown_column() {
        let msg = schema_err(EntitySchema::new(
            "t",
            vec![pk(), ColumnSpec::new("a", SemanticType::Int32)],
            vec![UniqueConstraint::new("uq", vec!["a".into(), "b".into()])],
        ));
        assert!(msg.contains("unknown column 'b'"));
    }

    #[test]
    fn test_empty_unique_group() {
        let msg = schema_err(EntitySchema::new("t", vec![pk()], vec![UniqueConstraint::new("uq", vec![])]));
        assert!(msg.contains("has no columns"));
    }

    #[test]
    fn test_reserved_and_separator_names() {
        let msg = schema_err(EntitySchema::new(
            "t",
            vec![pk(), ColumnSpec::new("limit", SemanticType::Int32)],
            vec![],
        ));
        assert!(msg.contains("reserved"));

        let msg = schema_err(EntitySchema::new(
            "t",
            vec![pk(), ColumnSpec::new("a____b", SemanticType::Int32)],
            vec![],
        ));
        assert!(msg.contains("must not contain"));
    }

    #[test]
    fn test_autoincrement_requires_integer() {
        let msg = schema_err(EntitySchema::new(
            "t",
            vec![ColumnSpec::new("id", SemanticType::String).primary_key().autoincrement()],
            vec![],
        ));
        assert!(msg.contains("must be an integer"));
    }

    #[test]
    fn test_default_must_fit_column_type() {
        for (ty, default) in [
            (SemanticType::Int16, Value::from("x")),
            (SemanticType::Int16, Value::Int(70_000)),
            (SemanticType::Boolean, Value::Int(1)),
            (SemanticType::Date, Value::from("yesterday")),
        ] {
            let err = EntitySchema::new(
                "t",
                vec![
                    ColumnSpec::new("id", SemanticType::Int64).primary_key(),
                    ColumnSpec::new("v", ty).default(default),
                ],
                vec![],
            )
            .unwrap_err();
            assert!(matches!(err, CrudError::SchemaError(ref m) if m.contains("'v'")), "{ty}: {err}");
        }
    }

    #[test]
    fn test_default_is_normalized() {
        let schema = EntitySchema::new(
            "t",
            vec![
                ColumnSpec::new("id", SemanticType::Int64).primary_key(),
                ColumnSpec::new("d", SemanticType::Date).default("2021-07-20"),
                ColumnSpec::new("n", SemanticType::Int16).nullable().default(Value::Null),
            ],
            vec![],
        )
        .unwrap();
        assert!(matches!(schema.lookup("d").unwrap().default, Some(Value::Date(_))));
        assert_eq!(schema.lookup("n").unwrap().default, Some(Value::Null));
    }

    #[test]
    fn test_nullable_primary_key_rejected() {
        let msg = schema_err(EntitySchema::new(
            "t",
            vec![ColumnSpec::new("id", SemanticType::Int32).primary_key().nullable()],
            vec![],
        ));
        assert!(msg.contains("cannot be nullable"));
    }

    #[test]
    fn test_lookup_unknown_column() {
        let schema = EntitySchema::new("t", vec![pk()], vec![]).unwrap();
        let err = schema.lookup("ghost").unwrap_err();
        assert!(matches!(err, CrudError::UnknownColumn { ref column, .. } if column == "ghost"));
    }

    #[test]
    fn test_single_primary_key_composite() {
        let schema = EntitySchema::new(
            "t",
            vec![
                ColumnSpec::new("a", SemanticType::Int32).primary_key(),
                ColumnSpec::new("b", SemanticType::Int32).primary_key(),
            ],
            vec![],
        )
        .unwrap();
        assert_eq!(schema.primary_key_columns().count(), 2);
        assert!(matches!(schema.single_primary_key(), Err(CrudError::SchemaError(_))));
    }

    #[test]
    fn test_registry_register_twice() {
        let mut registry = SchemaRegistry::new();
        registry.register("t", vec![pk()]).unwrap();
        let err = registry.register("t", vec![pk()]).unwrap_err();
        assert!(matches!(err, CrudError::SchemaError(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_unknown_entity() {
        let registry = SchemaRegistry::new().into_shared();
        assert!(registry.is_empty());
        assert!(matches!(registry.get("nope"), Err(CrudError::NotFound(_))));
    }

    #[test]
    fn test_registry_concurrent_reads() {
        let mut registry = SchemaRegistry::new();
        registry.register("t", vec![pk()]).unwrap();
        let registry = registry.into_shared();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.lookup("t", "primary_key").is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
