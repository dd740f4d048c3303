//! The filter compiler.
//!
//! [`FilterCompiler`] turns the raw query parameters of one request into a
//! [`FilterSet`] and a [`PaginationSpec`]. Validation runs as three passes
//! over the whole parameter map, so the first failing category wins:
//!
//! 1. columns: every non-reserved key must name a registered column
//!    ([`CrudError::UnknownColumn`]);
//! 2. operators: the key must have a known slot and modifier, the operator
//!    literal must exist for the slot, and the column's type must allow the
//!    operator class ([`CrudError::ValidationError`]);
//! 3. operands: every value must parse as the column's semantic type
//!    ([`CrudError::ValidationError`] with `column`, `literal`, `expected`).
//!
//! Pagination parameters are validated after the three passes. Within a pass
//! keys are checked in request order. Nothing here touches storage.

use std::collections::BTreeMap;

use quickcrud_core::settings::ApiSettings;
use quickcrud_core::{CrudResult, ParamMap, ValidationError};

use super::filters::{FilterClause, FilterSet, Predicate};
use super::grammar::{parse_key, KeyShape, Slot, MODIFIER_SEPARATOR, SLOT_SEPARATOR};
use super::operators::{is_allowed, ListOp, MatchMode, OperatorClass, RangeFromOp, RangeToOp};
use super::pagination::{PaginationSpec, RESERVED_PARAMS};
use crate::fields::{ColumnSpec, SemanticType};
use crate::registry::EntitySchema;
use crate::value::Value;

/// Strictness switches for the compiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Fail when a modifier key arrives without operand values for its slot.
    /// When `false`, such a clause is kept and matches everything.
    pub reject_operandless_modifiers: bool,
}

impl CompileOptions {
    /// Reads the options from the API settings.
    pub const fn from_settings(api: &ApiSettings) -> Self {
        Self {
            reject_operandless_modifiers: api.reject_operandless_modifiers,
        }
    }
}

/// The result of compiling one request's parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
    /// The conjunctive filter.
    pub filters: FilterSet,
    /// Limit, offset, and ordering.
    pub pagination: PaginationSpec,
}

/// Compiles request parameters against one entity schema.
///
/// # Examples
///
/// ```
/// use quickcrud_core::ParamMap;
/// use quickcrud_db::fields::{ColumnSpec, SemanticType};
/// use quickcrud_db::query::FilterCompiler;
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
///
/// let params = ParamMap::parse(
///     "primary_key____list=0&primary_key____list=1\
///      &text_value____list_____comparison_operator=Not_equal&text_value____list=string111\
///      &limit=10",
/// );
/// let compiled = FilterCompiler::new(&schema).compile(&params).unwrap();
/// assert_eq!(compiled.filters.len(), 2);
/// assert_eq!(compiled.pagination.limit, Some(10));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'a> {
    schema: &'a EntitySchema,
    options: CompileOptions,
}

/// A filter key that passed the column check.
struct BoundKey<'a, 'p> {
    key: &'p str,
    shape: KeyShape<'p>,
    column: &'a ColumnSpec,
    values: &'p [String],
}

/// Operators and operands gathered for one column.
struct ColumnFilter {
    semantic_type: SemanticType,
    range_seen: bool,
    from_op: Option<RangeFromOp>,
    to_op: Option<RangeToOp>,
    from: Option<Value>,
    to: Option<Value>,
    list_op: Option<ListOp>,
    list: Option<Vec<Value>>,
    match_mode: Option<MatchMode>,
    patterns: Option<Vec<String>>,
}

impl ColumnFilter {
    const fn new(semantic_type: SemanticType) -> Self {
        Self {
            semantic_type,
            range_seen: false,
            from_op: None,
            to_op: None,
            from: None,
            to: None,
            list_op: None,
            list: None,
            match_mode: None,
            patterns: None,
        }
    }

    fn into_clauses(self, column: &str) -> impl Iterator<Item = FilterClause> + '_ {
        let ty = self.semantic_type;
        let range = self.range_seen.then(|| Predicate::Range {
            from_op: self.from_op.unwrap_or_default(),
            from: self.from,
            to_op: self.to_op.unwrap_or_default(),
            to: self.to,
        });
        let list = self.list.map(|values| Predicate::List {
            op: self.list_op.unwrap_or_default(),
            values,
        });
        let matching = self.patterns.map(|patterns| Predicate::Match {
            mode: self.match_mode.unwrap_or_default(),
            patterns,
        });
        [range, list, matching]
            .into_iter()
            .flatten()
            .map(move |predicate| FilterClause::new(column, ty, predicate))
    }
}

impl<'a> FilterCompiler<'a> {
    /// Creates a compiler with default (lenient) options.
    pub fn new(schema: &'a EntitySchema) -> Self {
        Self {
            schema,
            options: CompileOptions::default(),
        }
    }

    /// Replaces the compile options.
    #[must_use]
    pub const fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compiles filters and pagination.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::UnknownColumn`](quickcrud_core::CrudError::UnknownColumn)
    /// or [`CrudError::ValidationError`](quickcrud_core::CrudError::ValidationError)
    /// as described in the module docs.
    pub fn compile(&self, params: &ParamMap) -> CrudResult<CompiledQuery> {
        let filters = self.compile_filter_params(params)?;
        let pagination = PaginationSpec::from_params(params, self.schema)?;
        tracing::debug!(
            entity = self.schema.name(),
            clauses = filters.len(),
            active = filters.active_clauses().count(),
            limit = ?pagination.limit,
            offset = pagination.offset,
            "Compiled query parameters"
        );
        Ok(CompiledQuery {
            filters,
            pagination,
        })
    }

    /// Compiles filters only, rejecting pagination parameters.
    ///
    /// Used by write paths, which act on every matching row.
    ///
    /// # Errors
    ///
    /// As [`compile`](Self::compile), plus a `ValidationError` if `limit`,
    /// `offset`, or `order_by_columns` is present.
    pub fn compile_filters(&self, params: &ParamMap) -> CrudResult<FilterSet> {
        let filters = self.compile_filter_params(params)?;
        if let Some(reserved) = params.keys().find(|k| RESERVED_PARAMS.contains(k)) {
            return Err(ValidationError::new(
                format!("'{reserved}' is only accepted when reading a collection"),
                "pagination_not_allowed",
            )
            .with_param("parameter", reserved)
            .into());
        }
        tracing::debug!(
            entity = self.schema.name(),
            clauses = filters.len(),
            "Compiled filter parameters"
        );
        Ok(filters)
    }

    fn compile_filter_params(&self, params: &ParamMap) -> CrudResult<FilterSet> {
        let keys = self.bind_columns(params)?;
        let mut columns = self.resolve_operators(&keys)?;
        self.parse_operands(&keys, &mut columns)?;
        Ok(Self::assemble(columns))
    }

    // ── Pass 1: columns ──────────────────────────────────────────────

    fn bind_columns<'p>(&self, params: &'p ParamMap) -> CrudResult<Vec<BoundKey<'a, 'p>>> {
        params
            .iter()
            .filter(|(key, _)| !RESERVED_PARAMS.contains(key))
            .map(|(key, values)| {
                let shape = parse_key(key);
                let column = self.schema.lookup(shape.column())?;
                Ok(BoundKey {
                    key,
                    shape,
                    column,
                    values,
                })
            })
            .collect()
    }

    // ── Pass 2: operators ────────────────────────────────────────────

    fn resolve_operators(&self, keys: &[BoundKey<'a, '_>]) -> CrudResult<BTreeMap<&'a str, ColumnFilter>> {
        let mut columns: BTreeMap<&'a str, ColumnFilter> = BTreeMap::new();

        for bound in keys {
            let name = bound.column.name.as_str();
            let (slot, modifier) = match bound.shape {
                KeyShape::Operand { slot, .. } => (slot, None),
                KeyShape::Modifier { slot, modifier, .. } => (slot, Some(modifier)),
                KeyShape::UnknownSlot { slot, .. } => {
                    return Err(ValidationError::new(
                        format!("Unknown filter slot '{slot}' in '{}'", bound.key),
                        "unknown_slot",
                    )
                    .with_param("column", name)
                    .with_param("slot", slot)
                    .into());
                }
                KeyShape::Bare { .. } => {
                    return Err(ValidationError::new(
                        format!(
                            "Parameter '{}' needs a filter slot such as '{name}{SLOT_SEPARATOR}list'",
                            bound.key
                        ),
                        "missing_slot",
                    )
                    .with_param("column", name)
                    .into());
                }
            };

            let entry = columns
                .entry(name)
                .or_insert_with(|| ColumnFilter::new(bound.column.semantic_type));
            match slot {
                Slot::From | Slot::To => entry.range_seen = true,
                Slot::List => {
                    entry.list.get_or_insert_with(Vec::new);
                }
                Slot::Str => {
                    entry.patterns.get_or_insert_with(Vec::new);
                }
            }

            let Some(modifier) = modifier else { continue };
            let modifier = modifier.map_err(|raw| {
                ValidationError::new(
                    format!("Unknown modifier '{raw}' in '{}'", bound.key),
                    "unknown_modifier",
                )
                .with_param("column", name)
                .with_param("modifier", raw)
            })?;
            if modifier != slot.modifier() {
                return Err(ValidationError::new(
                    format!(
                        "Slot '{slot}' takes '{MODIFIER_SEPARATOR}{}', not '{MODIFIER_SEPARATOR}{}'",
                        slot.modifier().as_str(),
                        modifier.as_str()
                    ),
                    "modifier_mismatch",
                )
                .with_param("column", name)
                .with_param("slot", slot.as_str())
                .into());
            }

            let literal = bound.values.last().map_or("", String::as_str);
            let unknown = || {
                ValidationError::new(
                    format!("Unknown operator '{literal}' for slot '{slot}' of column '{name}'"),
                    "unknown_operator",
                )
                .with_param("column", name)
                .with_param("operator", literal)
            };
            match slot {
                Slot::From => entry.from_op = Some(RangeFromOp::parse(literal).ok_or_else(unknown)?),
                Slot::To => entry.to_op = Some(RangeToOp::parse(literal).ok_or_else(unknown)?),
                Slot::List => entry.list_op = Some(ListOp::parse(literal).ok_or_else(unknown)?),
                Slot::Str => entry.match_mode = Some(MatchMode::parse(literal).ok_or_else(unknown)?),
            }
        }

        for bound in keys {
            let column = bound.column;
            let Some(filter) = columns.get(column.name.as_str()) else { continue };
            let (class, operator) = match bound.shape {
                KeyShape::Operand { slot, .. } | KeyShape::Modifier { slot, .. } => match slot {
                    Slot::From | Slot::To => (OperatorClass::Range, slot.as_str()),
                    Slot::List => {
                        let op = filter.list_op.unwrap_or_default();
                        (op.class(), op.as_str())
                    }
                    Slot::Str => (OperatorClass::StringMatch, slot.as_str()),
                },
                KeyShape::UnknownSlot { .. } | KeyShape::Bare { .. } => continue,
            };
            if !is_allowed(column.semantic_type, class) {
                return Err(ValidationError::operator_not_allowed(
                    &column.name,
                    operator,
                    column.semantic_type.name(),
                )
                .with_param("operator_class", class.as_str())
                .into());
            }
        }

        Ok(columns)
    }

    // ── Pass 3: operands ─────────────────────────────────────────────

    fn parse_operands(
        &self,
        keys: &[BoundKey<'a, '_>],
        columns: &mut BTreeMap<&'a str, ColumnFilter>,
    ) -> CrudResult<()> {
        for bound in keys {
            let KeyShape::Operand { slot, .. } = bound.shape else { continue };
            let column = bound.column;
            let Some(filter) = columns.get_mut(column.name.as_str()) else { continue };

            if slot == Slot::Str {
                filter.patterns = Some(bound.values.to_vec());
                continue;
            }

            let parsed: Vec<Value> = bound
                .values
                .iter()
                .map(|literal| {
                    Value::parse_literal(literal, column.semantic_type).ok_or_else(|| {
                        ValidationError::invalid_operand(&column.name, literal, column.semantic_type.name())
                    })
                })
                .collect::<Result<_, _>>()?;

            match slot {
                Slot::From => filter.from = parsed.into_iter().last(),
                Slot::To => filter.to = parsed.into_iter().last(),
                Slot::List | Slot::Str => filter.list = Some(parsed),
            }
        }

        if self.options.reject_operandless_modifiers {
            for bound in keys {
                let KeyShape::Modifier { slot, .. } = bound.shape else { continue };
                let Some(filter) = columns.get(bound.column.name.as_str()) else { continue };
                let empty = match slot {
                    Slot::From => filter.from.is_none(),
                    Slot::To => filter.to.is_none(),
                    Slot::List => filter.list.as_ref().map_or(true, Vec::is_empty),
                    Slot::Str => filter.patterns.as_ref().map_or(true, Vec::is_empty),
                };
                if empty {
                    return Err(ValidationError::new(
                        format!("Modifier '{}' has no operand values", bound.key),
                        "missing_operand",
                    )
                    .with_param("column", bound.column.name.as_str())
                    .with_param("slot", slot.as_str())
                    .into());
                }
            }
        }

        Ok(())
    }

    // ── Assembly ─────────────────────────────────────────────────────

    fn assemble(columns: BTreeMap<&'a str, ColumnFilter>) -> FilterSet {
        let mut filters = FilterSet::new();
        for (name, filter) in columns {
            for clause in filter.into_clauses(name) {
                filters.insert(clause);
            }
        }
        filters
    }
}
