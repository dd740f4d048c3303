//! Structured filter predicates.
//!
//! A [`FilterClause`] binds one column to one predicate, and a [`FilterSet`]
//! is the conjunction of all clauses of a request. A set holds at most one
//! clause per `(column, ClauseSlot)`, so a column can carry a range clause,
//! a list clause, and a match clause at the same time, all ANDed.
//!
//! A clause without operands is kept (its operator choice is part of the
//! compiled result) but matches every row.
//!
//! [`FilterSet::matcher`] evaluates a set against in-memory rows with SQL
//! NULL semantics: any non-empty clause on a NULL cell fails.
//! Case-insensitive matching folds ASCII letters only, as SQLite's `LOWER`
//! does; `É` and `é` are different characters to it.

use std::collections::BTreeMap;

use quickcrud_core::{CrudError, CrudResult};
use regex::Regex;

use super::operators::{ListOp, MatchMode, OperatorClass, RangeFromOp, RangeToOp};
use crate::fields::SemanticType;
use crate::row::Row;
use crate::value::Value;

/// Which of a column's clause slots a clause occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClauseSlot {
    /// `from` / `to` bounds.
    Range,
    /// `list` operands.
    List,
    /// `str` patterns.
    Match,
}

/// The operator and operands of one clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Lower and upper bounds, both optional and ANDed.
    Range {
        /// Operator for the lower bound.
        from_op: RangeFromOp,
        /// The lower bound.
        from: Option<Value>,
        /// Operator for the upper bound.
        to_op: RangeToOp,
        /// The upper bound.
        to: Option<Value>,
    },
    /// A single membership or equality test against all listed values.
    List {
        /// The list operator.
        op: ListOp,
        /// The operands in arrival order.
        values: Vec<Value>,
    },
    /// LIKE patterns, ORed together, optionally negated as a whole.
    Match {
        /// The matching mode.
        mode: MatchMode,
        /// The patterns in arrival order (`%` any run, `_` one character).
        patterns: Vec<String>,
    },
}

impl Predicate {
    /// The slot this predicate occupies.
    pub const fn slot(&self) -> ClauseSlot {
        match self {
            Self::Range { .. } => ClauseSlot::Range,
            Self::List { .. } => ClauseSlot::List,
            Self::Match { .. } => ClauseSlot::Match,
        }
    }

    /// The operator class this predicate exercises.
    pub const fn operator_class(&self) -> OperatorClass {
        match self {
            Self::Range { .. } => OperatorClass::Range,
            Self::List { op, .. } => op.class(),
            Self::Match { .. } => OperatorClass::StringMatch,
        }
    }

    /// Returns `true` if no operand was supplied.
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Range { from, to, .. } => from.is_none() && to.is_none(),
            Self::List { values, .. } => values.is_empty(),
            Self::Match { patterns, .. } => patterns.is_empty(),
        }
    }
}

/// One validated constraint on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    /// The column the clause applies to.
    pub column: String,
    /// The column's semantic type, used by SQL rendering and evaluation.
    pub semantic_type: SemanticType,
    /// The operator and operands.
    pub predicate: Predicate,
}

impl FilterClause {
    /// Creates a clause.
    pub fn new(column: impl Into<String>, semantic_type: SemanticType, predicate: Predicate) -> Self {
        Self {
            column: column.into(),
            semantic_type,
            predicate,
        }
    }

    /// Equality against a single value, as used for primary-key lookups.
    pub fn equals(column: impl Into<String>, semantic_type: SemanticType, value: Value) -> Self {
        Self::new(
            column,
            semantic_type,
            Predicate::List {
                op: ListOp::Equal,
                values: vec![value],
            },
        )
    }

    /// The slot this clause occupies.
    pub const fn slot(&self) -> ClauseSlot {
        self.predicate.slot()
    }

    /// Returns `true` if the clause matches every row.
    pub fn is_noop(&self) -> bool {
        self.predicate.is_noop()
    }
}

/// The conjunction of every clause of a request.
///
/// # Examples
///
/// ```
/// use quickcrud_db::fields::SemanticType;
/// use quickcrud_db::query::{FilterClause, FilterSet};
/// use quickcrud_db::row::Row;
/// use quickcrud_db::value::Value;
///
/// let mut filters = FilterSet::new();
/// filters.insert(FilterClause::equals("primary_key", SemanticType::Int64, Value::Int(1)));
///
/// let matcher = filters.matcher().unwrap();
/// assert!(matcher.matches(&Row::from_pairs([("primary_key", 1_i64)])));
/// assert!(!matcher.matches(&Row::from_pairs([("primary_key", 2_i64)])));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    clauses: BTreeMap<(String, ClauseSlot), FilterClause>,
}

impl FilterSet {
    /// Creates an empty set, which matches every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause, replacing any clause in the same column slot.
    pub fn insert(&mut self, clause: FilterClause) -> Option<FilterClause> {
        self.clauses
            .insert((clause.column.clone(), clause.slot()), clause)
    }

    /// Returns the clause in a column slot.
    pub fn get(&self, column: &str, slot: ClauseSlot) -> Option<&FilterClause> {
        self.clauses.get(&(column.to_string(), slot))
    }

    /// Returns `true` if any clause targets the column.
    pub fn touches(&self, column: &str) -> bool {
        self.clauses.keys().any(|(c, _)| c == column)
    }

    /// Iterates over every clause, ordered by column then slot.
    pub fn clauses(&self) -> impl Iterator<Item = &FilterClause> {
        self.clauses.values()
    }

    /// Iterates over the clauses that constrain rows.
    pub fn active_clauses(&self) -> impl Iterator<Item = &FilterClause> {
        self.clauses().filter(|c| !c.is_noop())
    }

    /// Returns the number of clauses, operand-less ones included.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Returns `true` if there are no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Prepares the set for evaluation against in-memory rows.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::DatabaseError`] if a pattern cannot be compiled.
    pub fn matcher(&self) -> CrudResult<RowMatcher> {
        let tests = self
            .active_clauses()
            .map(|clause| {
                let test = match &clause.predicate {
                    Predicate::Range { from_op, from, to_op, to } => ClauseTest::Range {
                        from: from.clone().map(|v| (*from_op, v)),
                        to: to.clone().map(|v| (*to_op, v)),
                    },
                    Predicate::List { op, values } => ClauseTest::List {
                        negated: op.is_negated(),
                        values: values.clone(),
                    },
                    Predicate::Match { mode, patterns } => ClauseTest::Match {
                        negated: mode.is_negated(),
                        patterns: patterns
                            .iter()
                            .map(|p| like_to_regex(p, mode.is_case_insensitive()))
                            .collect::<CrudResult<_>>()?,
                    },
                };
                Ok((clause.column.clone(), test))
            })
            .collect::<CrudResult<_>>()?;
        Ok(RowMatcher { tests })
    }
}

/// A [`FilterSet`] prepared for in-memory evaluation.
#[derive(Debug)]
pub struct RowMatcher {
    tests: Vec<(String, ClauseTest)>,
}

#[derive(Debug)]
enum ClauseTest {
    Range {
        from: Option<(RangeFromOp, Value)>,
        to: Option<(RangeToOp, Value)>,
    },
    List {
        negated: bool,
        values: Vec<Value>,
    },
    Match {
        negated: bool,
        patterns: Vec<Regex>,
    },
}

impl RowMatcher {
    /// Returns `true` if the row satisfies every clause.
    pub fn matches(&self, row: &Row) -> bool {
        self.tests.iter().all(|(column, test)| {
            let value = row.get(column).unwrap_or(&Value::Null);
            !value.is_null() && test.holds(value)
        })
    }
}

impl ClauseTest {
    /// Evaluates a clause against a non-null cell.
    fn holds(&self, value: &Value) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};

        match self {
            Self::Range { from, to } => {
                let lower = from.as_ref().map_or(true, |(op, bound)| {
                    match (op, value.compare(bound)) {
                        (RangeFromOp::GreaterThanOrEqualTo, Some(Greater | Equal))
                        | (RangeFromOp::GreaterThan, Some(Greater)) => true,
                        _ => false,
                    }
                });
                let upper = to.as_ref().map_or(true, |(op, bound)| {
                    match (op, value.compare(bound)) {
                        (RangeToOp::LessThanOrEqualTo, Some(Less | Equal))
                        | (RangeToOp::LessThan, Some(Less)) => true,
                        _ => false,
                    }
                });
                lower && upper
            }
            Self::List { negated, values } => {
                let found = values.iter().any(|v| value.sql_eq(v));
                found != *negated
            }
            Self::Match { negated, patterns } => match value.as_str() {
                Some(text) => patterns.iter().any(|re| re.is_match(text)) != *negated,
                None => false,
            },
        }
    }
}

/// Translates a LIKE pattern into an anchored regular expression.
fn like_to_regex(pattern: &str, case_insensitive: bool) -> CrudResult<Regex> {
    let mut re = String::from("(?s)^");
    let mut literal = [0_u8; 4];
    for ch in pattern.chars() {
        match ch {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            letter if case_insensitive && letter.is_ascii_alphabetic() => {
                re.push('[');
                re.push(letter.to_ascii_lowercase());
                re.push(letter.to_ascii_uppercase());
                re.push(']');
            }
            other => re.push_str(&regex::escape(other.encode_utf8(&mut literal))),
        }
    }
    re.push('$');
    Regex::new(&re)
        .map_err(|e| CrudError::DatabaseError(format!("Invalid match pattern '{pattern}': {e}")))
}
