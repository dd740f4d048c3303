//! The mutation coordinator.
//!
//! [`MutationCoordinator`] is the entry point the HTTP layer calls. It
//! resolves the entity, compiles request parameters, decodes JSON bodies
//! into typed [`Row`]s, and then makes exactly one executor call. Every
//! client error is raised before storage is touched.
//!
//! Collection operations treat zero matches as success. Single-resource
//! operations (`*_one`) address a row by primary key and report zero
//! matches as [`CrudError::NotFound`].

use std::sync::Arc;

use quickcrud_core::{CrudError, CrudResult, ParamMap, ValidationError};
use serde_json::Value as Json;

use crate::executor::{FindResult, QueryExecutor, UpdateMode};
use crate::query::{CompileOptions, FilterClause, FilterCompiler, FilterSet, PaginationSpec};
use crate::registry::{EntitySchema, SchemaRegistry};
use crate::row::Row;
use crate::value::Value;

/// What a JSON body is being decoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Insert,
    Replace,
    Patch,
}

/// Applies read, insert, replace, patch, and delete semantics on top of a
/// [`QueryExecutor`].
///
/// The coordinator is cheap to clone and safe to share between request
/// handlers; the registry is read-only and the executor provides atomicity.
#[derive(Clone)]
pub struct MutationCoordinator {
    registry: Arc<SchemaRegistry>,
    executor: Arc<dyn QueryExecutor>,
    options: CompileOptions,
}

impl std::fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("entities", &self.registry.entity_names().collect::<Vec<_>>())
            .field("engine", &self.executor.engine())
            .field("options", &self.options)
            .finish()
    }
}

impl MutationCoordinator {
    /// Creates a coordinator with lenient compile options.
    pub fn new(registry: Arc<SchemaRegistry>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            registry,
            executor,
            options: CompileOptions::default(),
        }
    }

    /// Sets the compile options.
    #[must_use]
    pub const fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// The schema registry.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// The storage executor.
    pub fn executor(&self) -> &Arc<dyn QueryExecutor> {
        &self.executor
    }

    /// Prepares storage for every registered entity.
    pub async fn ensure_entities(&self) -> CrudResult<()> {
        for schema in self.registry.schemas() {
            self.executor.ensure_entity(schema).await?;
        }
        tracing::info!(
            engine = self.executor.engine(),
            entities = self.registry.len(),
            "Storage ready"
        );
        Ok(())
    }

    fn compiler<'a>(&self, schema: &'a EntitySchema) -> FilterCompiler<'a> {
        FilterCompiler::new(schema).with_options(self.options)
    }

    // ── Collection operations ───────────────────────────────────────────

    /// Returns one page of matching rows and the total match count.
    pub async fn find_many(&self, entity: &str, params: &ParamMap) -> CrudResult<FindResult> {
        let schema = self.registry.get(entity)?;
        let compiled = self.compiler(&schema).compile(params)?;
        let result = self
            .executor
            .find(&schema, &compiled.filters, &compiled.pagination)
            .await?;
        tracing::debug!(entity, total = result.total, returned = result.rows.len(), "Find");
        Ok(result)
    }

    /// Inserts a JSON array of row objects atomically.
    pub async fn insert_many(&self, entity: &str, body: &Json) -> CrudResult<Vec<Row>> {
        let schema = self.registry.get(entity)?;
        let Json::Array(items) = body else {
            return Err(invalid_body("Expected a JSON array of row objects").into());
        };
        let rows = items
            .iter()
            .map(|item| decode_row(&schema, item, BodyKind::Insert))
            .collect::<CrudResult<Vec<_>>>()?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let count = rows.len();
        let inserted = log_conflict(entity, self.executor.insert_many(&schema, rows).await)?;
        tracing::info!(entity, count, "Inserted rows");
        Ok(inserted)
    }

    /// Inserts a single JSON row object.
    pub async fn insert_one(&self, entity: &str, body: &Json) -> CrudResult<Row> {
        let schema = self.registry.get(entity)?;
        let row = decode_row(&schema, body, BodyKind::Insert)?;
        let inserted = log_conflict(entity, self.executor.insert_many(&schema, vec![row]).await)?;
        tracing::info!(entity, count = 1, "Inserted rows");
        inserted
            .into_iter()
            .next()
            .ok_or_else(|| CrudError::DatabaseError("Insert returned no row".to_string()))
    }

    /// Replaces every matching row with the body. Absent optional columns
    /// reset to their default.
    pub async fn replace_many(&self, entity: &str, params: &ParamMap, body: &Json) -> CrudResult<Vec<Row>> {
        let schema = self.registry.get(entity)?;
        let filters = self.compiler(&schema).compile_filters(params)?;
        let values = decode_row(&schema, body, BodyKind::Replace)?;
        self.update(&schema, &filters, &values, UpdateMode::Replace).await
    }

    /// Changes only the listed columns on every matching row.
    pub async fn patch_many(&self, entity: &str, params: &ParamMap, body: &Json) -> CrudResult<Vec<Row>> {
        let schema = self.registry.get(entity)?;
        let filters = self.compiler(&schema).compile_filters(params)?;
        let values = decode_row(&schema, body, BodyKind::Patch)?;
        self.update(&schema, &filters, &values, UpdateMode::Patch).await
    }

    /// Deletes every matching row and returns the removed rows.
    pub async fn delete_many(&self, entity: &str, params: &ParamMap) -> CrudResult<Vec<Row>> {
        let schema = self.registry.get(entity)?;
        let filters = self.compiler(&schema).compile_filters(params)?;
        self.delete(&schema, &filters).await
    }

    // ── Single-resource operations ──────────────────────────────────────

    /// Fetches the row with primary key `pk` that also matches `params`.
    pub async fn find_one(&self, entity: &str, pk: &str, params: &ParamMap) -> CrudResult<Row> {
        let schema = self.registry.get(entity)?;
        let filters = self.keyed_filters(&schema, pk, params)?;
        let result = self
            .executor
            .find(&schema, &filters, &PaginationSpec::default().with_limit(1))
            .await?;
        result.rows.into_iter().next().ok_or_else(|| not_found(&schema, pk))
    }

    /// Replaces the row with primary key `pk`.
    pub async fn replace_one(&self, entity: &str, pk: &str, params: &ParamMap, body: &Json) -> CrudResult<Row> {
        let schema = self.registry.get(entity)?;
        let filters = self.keyed_filters(&schema, pk, params)?;
        let values = decode_row(&schema, body, BodyKind::Replace)?;
        let rows = self.update(&schema, &filters, &values, UpdateMode::Replace).await?;
        rows.into_iter().next().ok_or_else(|| not_found(&schema, pk))
    }

    /// Patches the row with primary key `pk`.
    pub async fn patch_one(&self, entity: &str, pk: &str, params: &ParamMap, body: &Json) -> CrudResult<Row> {
        let schema = self.registry.get(entity)?;
        let filters = self.keyed_filters(&schema, pk, params)?;
        let values = decode_row(&schema, body, BodyKind::Patch)?;
        let rows = self.update(&schema, &filters, &values, UpdateMode::Patch).await?;
        rows.into_iter().next().ok_or_else(|| not_found(&schema, pk))
    }

    /// Deletes the row with primary key `pk`.
    pub async fn delete_one(&self, entity: &str, pk: &str, params: &ParamMap) -> CrudResult<Row> {
        let schema = self.registry.get(entity)?;
        let filters = self.keyed_filters(&schema, pk, params)?;
        let rows = self.delete(&schema, &filters).await?;
        rows.into_iter().next().ok_or_else(|| not_found(&schema, pk))
    }

    // ── Internals ───────────────────────────────────────────────────────

    async fn update(
        &self,
        schema: &EntitySchema,
        filters: &FilterSet,
        values: &Row,
        mode: UpdateMode,
    ) -> CrudResult<Vec<Row>> {
        if mode.assignments(schema, values)?.is_empty() {
            let unchanged = self.executor.find(schema, filters, &PaginationSpec::default()).await?;
            tracing::debug!(entity = schema.name(), matched = unchanged.rows.len(), "Empty update");
            return Ok(unchanged.rows);
        }
        let rows = log_conflict(
            schema.name(),
            self.executor.update_matching(schema, filters, values, mode).await,
        )?;
        tracing::info!(entity = schema.name(), ?mode, count = rows.len(), "Updated rows");
        Ok(rows)
    }

    async fn delete(&self, schema: &EntitySchema, filters: &FilterSet) -> CrudResult<Vec<Row>> {
        let rows = self.executor.delete_matching(schema, filters).await?;
        tracing::info!(entity = schema.name(), count = rows.len(), "Deleted rows");
        Ok(rows)
    }

    /// Compiles non-key filters and ANDs them with primary-key equality.
    fn keyed_filters(&self, schema: &EntitySchema, pk: &str, params: &ParamMap) -> CrudResult<FilterSet> {
        let key = schema.single_primary_key()?;
        let mut filters = self.compiler(schema).compile_filters(params)?;
        if filters.touches(&key.name) {
            return Err(ValidationError::new(
                format!("Filters on primary key column '{}' are not allowed here", key.name),
                "key_filter_not_allowed",
            )
            .with_param("column", &key.name)
            .into());
        }
        let value = Value::parse_literal(pk, key.semantic_type).ok_or_else(|| {
            ValidationError::invalid_operand(&key.name, pk, key.semantic_type.name())
        })?;
        filters.insert(FilterClause::equals(&key.name, key.semantic_type, value));
        Ok(filters)
    }
}

fn not_found(schema: &EntitySchema, pk: &str) -> CrudError {
    CrudError::NotFound(format!("No {} with primary key {pk}", schema.name()))
}

fn invalid_body(message: &str) -> ValidationError {
    ValidationError::new(message, "invalid_body")
}

fn log_conflict<T>(entity: &str, result: CrudResult<T>) -> CrudResult<T> {
    if let Err(CrudError::Conflict(detail)) = &result {
        tracing::warn!(entity, detail = %detail, "Uniqueness conflict");
    }
    result
}

/// Decodes one JSON object into a typed row in schema column order.
fn decode_row(schema: &EntitySchema, body: &Json, kind: BodyKind) -> CrudResult<Row> {
    let Json::Object(object) = body else {
        return Err(invalid_body("Expected a JSON object").into());
    };

    for key in object.keys() {
        let column = schema
            .column(key)
            .ok_or_else(|| CrudError::unknown_column(schema.name(), key.as_str()))?;
        if column.primary_key && kind != BodyKind::Insert {
            return Err(ValidationError::new(
                format!("Primary key column '{key}' cannot be changed"),
                "key_not_allowed",
            )
            .with_param("column", key.as_str())
            .into());
        }
    }

    let mut row = Row::new();
    for column in schema.columns() {
        let Some(json) = object.get(&column.name) else {
            let missing = match kind {
                BodyKind::Insert => column.is_required_on_insert(),
                BodyKind::Replace => !column.primary_key && column.replace_fallback().is_none(),
                BodyKind::Patch => false,
            };
            if missing {
                return Err(ValidationError::new(
                    format!("Missing required column '{}'", column.name),
                    "missing_column",
                )
                .with_param("column", &column.name)
                .into());
            }
            continue;
        };

        if json.is_null() {
            if !column.nullable {
                return Err(ValidationError::new(
                    format!("Column '{}' cannot be null", column.name),
                    "null_not_allowed",
                )
                .with_param("column", &column.name)
                .into());
            }
            row.set(&column.name, Value::Null);
            continue;
        }

        let value = Value::from_json(json, column.semantic_type).ok_or_else(|| {
            ValidationError::invalid_operand(&column.name, &json.to_string(), column.semantic_type.name())
        })?;
        row.set(&column.name, value);
    }
    Ok(row)
}
