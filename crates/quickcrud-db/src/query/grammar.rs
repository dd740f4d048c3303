//! The suffix-encoded parameter key grammar.
//!
//! A filter key names a column, a slot, and optionally a modifier:
//!
//! ```text
//! key      = column SLOT_SEP slot [ MODIFIER_SEP modifier ]
//! slot     = "from" | "to" | "list" | "str"
//! modifier = "comparison_operator" | "matching_pattern"
//! ```
//!
//! Parsing is table-driven: the column ends at the first slot separator that
//! is followed by a known slot name and then either the end of the key or a
//! modifier separator. Column names may therefore end in `_`, but may not
//! contain the slot separator itself (enforced at registration).
//!
//! [`parse_key`] only splits a key; it does not consult any schema. The
//! filter compiler decides what each shape means.

use std::fmt;

/// Separates the column from the slot.
pub const SLOT_SEPARATOR: &str = "____";

/// Separates the slot from the modifier suffix.
pub const MODIFIER_SEPARATOR: &str = "_____";

/// The operand slot a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Lower range bound.
    From,
    /// Upper range bound.
    To,
    /// List operands.
    List,
    /// String-match patterns.
    Str,
}

impl Slot {
    const TABLE: [(&'static str, Self); 4] = [
        ("from", Self::From),
        ("to", Self::To),
        ("list", Self::List),
        ("str", Self::Str),
    ];

    /// The slot name as written in keys.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::From => "from",
            Self::To => "to",
            Self::List => "list",
            Self::Str => "str",
        }
    }

    /// The modifier suffix this slot accepts.
    pub const fn modifier(self) -> Modifier {
        match self {
            Self::From | Self::To | Self::List => Modifier::ComparisonOperator,
            Self::Str => Modifier::MatchingPattern,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == text)
            .map(|(_, slot)| *slot)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A modifier suffix, selecting the concrete operator of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// `_____comparison_operator` on `from`, `to`, and `list`.
    ComparisonOperator,
    /// `_____matching_pattern` on `str`.
    MatchingPattern,
}

impl Modifier {
    /// The suffix as written in keys.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ComparisonOperator => "comparison_operator",
            Self::MatchingPattern => "matching_pattern",
        }
    }

    fn parse(text: &str) -> Option<Self> {
        match text {
            "comparison_operator" => Some(Self::ComparisonOperator),
            "matching_pattern" => Some(Self::MatchingPattern),
            _ => None,
        }
    }
}

/// The decomposition of one parameter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape<'a> {
    /// `column____slot`: carries operand values.
    Operand {
        /// The column part.
        column: &'a str,
        /// The slot.
        slot: Slot,
    },
    /// `column____slot_____modifier`: carries the operator literal.
    Modifier {
        /// The column part.
        column: &'a str,
        /// The slot.
        slot: Slot,
        /// The modifier, or the raw suffix if it is not a known modifier.
        modifier: Result<Modifier, &'a str>,
    },
    /// `column____???`: a slot separator followed by an unknown slot.
    UnknownSlot {
        /// The column part.
        column: &'a str,
        /// Everything after the first slot separator.
        slot: &'a str,
    },
    /// No slot separator at all.
    Bare {
        /// The whole key.
        column: &'a str,
    },
}

impl<'a> KeyShape<'a> {
    /// The column part of the key.
    pub const fn column(&self) -> &'a str {
        match *self {
            Self::Operand { column, .. }
            | Self::Modifier { column, .. }
            | Self::UnknownSlot { column, .. }
            | Self::Bare { column } => column,
        }
    }
}

/// Splits a parameter key into its grammatical parts.
///
/// # Examples
///
/// ```
/// use quickcrud_db::query::grammar::{parse_key, KeyShape, Modifier, Slot};
///
/// assert_eq!(
///     parse_key("int4_value____from"),
///     KeyShape::Operand { column: "int4_value", slot: Slot::From },
/// );
/// assert_eq!(
///     parse_key("text_value____str_____matching_pattern"),
///     KeyShape::Modifier {
///         column: "text_value",
///         slot: Slot::Str,
///         modifier: Ok(Modifier::MatchingPattern),
///     },
/// );
/// assert_eq!(parse_key("limit"), KeyShape::Bare { column: "limit" });
/// ```
pub fn parse_key(key: &str) -> KeyShape<'_> {
    let mut first_separator = None;
    for idx in separator_positions(key) {
        first_separator.get_or_insert(idx);
        let column = &key[..idx];
        if column.is_empty() {
            continue;
        }
        let rest = &key[idx + SLOT_SEPARATOR.len()..];
        let (slot_text, modifier_text) = match rest.split_once(MODIFIER_SEPARATOR) {
            Some((slot, modifier)) => (slot, Some(modifier)),
            None => (rest, None),
        };
        if let Some(slot) = Slot::parse(slot_text) {
            return match modifier_text {
                None => KeyShape::Operand { column, slot },
                Some(raw) => KeyShape::Modifier {
                    column,
                    slot,
                    modifier: Modifier::parse(raw).ok_or(raw),
                },
            };
        }
    }

    match first_separator {
        Some(idx) => KeyShape::UnknownSlot {
            column: &key[..idx],
            slot: &key[idx + SLOT_SEPARATOR.len()..],
        },
        None => KeyShape::Bare { column: key },
    }
}

/// Start offsets of every slot separator, overlapping runs included
/// (`"a_____b"` yields 1 and 2).
fn separator_positions(key: &str) -> impl Iterator<Item = usize> + '_ {
    key.char_indices()
        .map(|(idx, _)| idx)
        .filter(move |&idx| key[idx..].starts_with(SLOT_SEPARATOR))
}
