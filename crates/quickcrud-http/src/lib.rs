//! # quickcrud-http
//!
//! The HTTP surface of quickcrud, built on axum. Each registered entity gets
//! a collection route and a single-resource route; query strings carry
//! filters and pagination, bodies carry JSON rows.
//!
//! ## Modules
//!
//! - [`router`] - [`CrudRouter`], the route table and handlers
//! - [`response`] - Error-to-status mapping and JSON payloads
//! - [`app`] - [`CrudApp`], settings-driven assembly and serving

pub mod app;
pub mod response;
pub mod router;

pub use app::CrudApp;
pub use response::{ApiError, ApiResult};
pub use router::CrudRouter;
