//! The operator catalog.
//!
//! Every filter operator belongs to an [`OperatorClass`], and every
//! [`SemanticType`] allows a fixed set of classes. [`allowed_operators`] is
//! the single table the filter compiler consults to reject meaningless
//! combinations, such as a range bound on a boolean column.
//!
//! The concrete operators a request can select are the wire literals of
//! [`RangeFromOp`], [`RangeToOp`], [`ListOp`], and [`MatchMode`].

use std::collections::BTreeSet;
use std::fmt;

use crate::fields::SemanticType;

/// A category of comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorClass {
    /// Lower and upper bounds (`from` / `to`).
    Range,
    /// Set membership (`In` / `Not_in`).
    ListMembership,
    /// Exact equality against listed values (`Equal` / `Not_equal`).
    ListEquality,
    /// LIKE-style pattern matching on text.
    StringMatch,
}

impl OperatorClass {
    /// A short name for error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::ListMembership => "list membership",
            Self::ListEquality => "list equality",
            Self::StringMatch => "string match",
        }
    }
}

impl fmt::Display for OperatorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the operator classes legal on a semantic type.
///
/// # Examples
///
/// ```
/// use quickcrud_db::fields::SemanticType;
/// use quickcrud_db::query::{allowed_operators, OperatorClass};
///
/// assert!(allowed_operators(SemanticType::Int32).contains(&OperatorClass::Range));
/// assert!(!allowed_operators(SemanticType::Boolean).contains(&OperatorClass::Range));
/// assert!(allowed_operators(SemanticType::Binary).is_empty());
/// ```
pub fn allowed_operators(ty: SemanticType) -> BTreeSet<OperatorClass> {
    use OperatorClass::{ListEquality, ListMembership, Range, StringMatch};

    let classes: &[OperatorClass] = match ty {
        SemanticType::Binary => &[],
        SemanticType::Boolean => &[ListMembership, ListEquality],
        SemanticType::String | SemanticType::FixedChar => &[StringMatch, ListMembership, ListEquality],
        SemanticType::Int8
        | SemanticType::Int16
        | SemanticType::Int32
        | SemanticType::Int64
        | SemanticType::Float32
        | SemanticType::Float64
        | SemanticType::Date
        | SemanticType::Time
        | SemanticType::Timestamp
        | SemanticType::TimestampTz
        | SemanticType::TimeTz => &[Range, ListMembership, ListEquality],
    };
    classes.iter().copied().collect()
}

/// Returns `true` if the class is legal on the semantic type.
pub fn is_allowed(ty: SemanticType, class: OperatorClass) -> bool {
    allowed_operators(ty).contains(&class)
}

/// Generates the literal table for a wire-level operator enum.
macro_rules! wire_literals {
    ($ty:ident { $($variant:ident => $lit:literal),+ $(,)? }) => {
        impl $ty {
            /// Every operator in this group.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The literal used in request parameters.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $lit),+
                }
            }

            /// Parses a request literal. Matching is case-sensitive.
            pub fn parse(literal: &str) -> Option<Self> {
                match literal {
                    $($lit => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Operator for a lower bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RangeFromOp {
    /// `column >= bound`
    #[default]
    GreaterThanOrEqualTo,
    /// `column > bound`
    GreaterThan,
}

wire_literals!(RangeFromOp {
    GreaterThanOrEqualTo => "Greater_than_or_equal_to",
    GreaterThan => "Greater_than",
});

impl RangeFromOp {
    /// The SQL comparison operator.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::GreaterThanOrEqualTo => ">=",
            Self::GreaterThan => ">",
        }
    }
}

/// Operator for an upper bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RangeToOp {
    /// `column <= bound`
    #[default]
    LessThanOrEqualTo,
    /// `column < bound`
    LessThan,
}

wire_literals!(RangeToOp {
    LessThanOrEqualTo => "Less_than_or_equal_to",
    LessThan => "Less_than",
});

impl RangeToOp {
    /// The SQL comparison operator.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::LessThanOrEqualTo => "<=",
            Self::LessThan => "<",
        }
    }
}

/// Operator for a list of operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListOp {
    /// `column IN (values)`
    #[default]
    In,
    /// `column NOT IN (values)`
    NotIn,
    /// `column = v1 OR column = v2 ...`
    Equal,
    /// `column <> v1 AND column <> v2 ...`
    NotEqual,
}

wire_literals!(ListOp {
    In => "In",
    NotIn => "Not_in",
    Equal => "Equal",
    NotEqual => "Not_equal",
});

impl ListOp {
    /// The operator class this operator belongs to.
    pub const fn class(self) -> OperatorClass {
        match self {
            Self::In | Self::NotIn => OperatorClass::ListMembership,
            Self::Equal | Self::NotEqual => OperatorClass::ListEquality,
        }
    }

    /// Whether the operator excludes the listed values.
    pub const fn is_negated(self) -> bool {
        matches!(self, Self::NotIn | Self::NotEqual)
    }
}

/// How a string pattern is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchMode {
    /// `column LIKE pattern`
    #[default]
    CaseSensitive,
    /// `LOWER(column) LIKE LOWER(pattern)`
    CaseInsensitive,
    /// `NOT (column LIKE pattern)`
    NotCaseSensitive,
    /// `NOT (LOWER(column) LIKE LOWER(pattern))`
    NotCaseInsensitive,
}

wire_literals!(MatchMode {
    CaseSensitive => "case_sensitive",
    CaseInsensitive => "case_insensitive",
    NotCaseSensitive => "not_case_sensitive",
    NotCaseInsensitive => "not_case_insensitive",
});

impl MatchMode {
    /// Whether letter case is ignored.
    pub const fn is_case_insensitive(self) -> bool {
        matches!(self, Self::CaseInsensitive | Self::NotCaseInsensitive)
    }

    /// Whether the match is inverted.
    pub const fn is_negated(self) -> bool {
        matches!(self, Self::NotCaseSensitive | Self::NotCaseInsensitive)
    }
}
