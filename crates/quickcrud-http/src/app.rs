//! Settings-driven application assembly.
//!
//! [`CrudApp`] wires a [`SchemaRegistry`], the executor chosen by
//! `settings.database.engine`, and the compile options from
//! `settings.api` into a servable router.
//!
//! # Examples
//!
//! ```no_run
//! use quickcrud_core::Settings;
//! use quickcrud_db::{ColumnSpec, SchemaRegistry, SemanticType};
//! use quickcrud_http::CrudApp;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = SchemaRegistry::new();
//! registry.register("items", vec![ColumnSpec::new("id", SemanticType::Int64).primary_key()])?;
//!
//! let app = CrudApp::from_settings(Settings::default(), registry)?;
//! app.prepare().await?;
//! // app.run("0.0.0.0:8000").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::Router;
use quickcrud_core::{CrudError, CrudResult, Settings};
use quickcrud_db::{CompileOptions, MutationCoordinator, QueryExecutor, SchemaRegistry};

use crate::router::CrudRouter;

/// A configured quickcrud application.
pub struct CrudApp {
    settings: Settings,
    coordinator: MutationCoordinator,
}

impl CrudApp {
    /// Builds the app with the executor named by the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is unknown or the database cannot be
    /// opened.
    pub fn from_settings(settings: Settings, registry: SchemaRegistry) -> CrudResult<Self> {
        let executor = quickcrud_db_backends::executor_for(&settings.database)?;
        Ok(Self::with_executor(settings, registry, executor))
    }

    /// Builds the app around an existing executor.
    pub fn with_executor(
        settings: Settings,
        registry: SchemaRegistry,
        executor: Arc<dyn QueryExecutor>,
    ) -> Self {
        let coordinator = MutationCoordinator::new(registry.into_shared(), executor)
            .with_options(CompileOptions::from_settings(&settings.api));
        Self {
            settings,
            coordinator,
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the coordinator.
    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    /// Creates storage for every registered entity.
    pub async fn prepare(&self) -> CrudResult<()> {
        self.coordinator.ensure_entities().await
    }

    /// Returns the axum router.
    pub fn router(&self) -> Router {
        CrudRouter::new(self.coordinator.clone())
            .url_prefix(&self.settings.api.url_prefix)
            .into_router()
    }

    /// Prepares storage and serves HTTP on `addr` until the server stops.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be prepared, the address cannot be
    /// bound, or the server fails.
    pub async fn run(self, addr: &str) -> CrudResult<()> {
        self.prepare().await?;
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            CrudError::ConfigurationError(format!("Failed to bind to {addr}: {e}"))
        })?;

        tracing::info!(
            addr,
            engine = self.coordinator.executor().engine(),
            prefix = %self.settings.api.url_prefix,
            "Serving quickcrud"
        );

        axum::serve(listener, router)
            .await
            .map_err(|e| CrudError::OperationalError(format!("Server error: {e}")))?;
        Ok(())
    }
}

impl std::fmt::Debug for CrudApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudApp")
            .field("engine", &self.settings.database.engine)
            .field("url_prefix", &self.settings.api.url_prefix)
            .field("debug", &self.settings.debug)
            .finish()
    }
}
