//! Query compilation.
//!
//! Request parameters flow through this module in one direction:
//!
//! - [`grammar`] splits each parameter key into column, slot, and modifier;
//! - [`compiler`] validates keys and operands against an
//!   [`EntitySchema`](crate::registry::EntitySchema) and builds a
//!   [`FilterSet`] plus a [`PaginationSpec`];
//! - [`sql`] renders the result as parameterized SQL, while
//!   [`FilterSet::matcher`] evaluates it against in-memory rows.

pub mod compiler;
pub mod filters;
pub mod grammar;
pub mod operators;
pub mod pagination;
pub mod sql;

pub use compiler::{CompileOptions, CompiledQuery, FilterCompiler};
pub use filters::{ClauseSlot, FilterClause, FilterSet, Predicate, RowMatcher};
pub use operators::{
    allowed_operators, is_allowed, ListOp, MatchMode, OperatorClass, RangeFromOp, RangeToOp,
};
pub use pagination::{OrderBy, PaginationSpec};
pub use sql::{Dialect, SqlCompiler};
