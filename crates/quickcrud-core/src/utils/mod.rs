//! Utility types for quickcrud.
//!
//! - [`ParamMap`] - An insertion-ordered multimap for request parameters

pub mod params;

pub use params::ParamMap;
