//! Process bootstrap shared by the server binary and the CLI.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use libris_cache::MemoryCache;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::{modules, AppState};

/// A connected, migrated and initialized application.
pub struct Application {
    pub settings: Settings,
    pub state: AppState,
    pub registry: ModuleRegistry,
}

impl Application {
    /// Connect to the database, apply every module's migrations and run
    /// module initialization.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        tracing::info!(
            env = ?settings.environment,
            db = %settings.database.url,
            "libris bootstrap starting"
        );

        let db = libris_db::connect(&settings.database.url, settings.database.max_connections)
            .await
            .context("failed to open database")?;
        let state = AppState::new(&settings, db, Arc::new(MemoryCache::new()))
            .context("failed to build application state")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &state);

        let applied = libris_db::migrate(&state.db, &registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, "migrations complete");

        let ctx = InitCtx {
            settings: &settings,
            db: &state.db,
        };
        registry.init_modules(&ctx).await?;

        tracing::info!(modules = registry.module_count(), "libris bootstrap complete");
        Ok(Self {
            settings,
            state,
            registry,
        })
    }

    /// The full HTTP router, middleware included.
    pub fn router(&self) -> Router {
        libris_http::build_router(&self.registry, &self.settings)
    }

    /// Start modules, serve until shutdown, then stop modules.
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
            db: &self.state.db,
        };
        self.registry.start_modules(&ctx).await?;

        let served = libris_http::start_server(&self.registry, &self.settings).await;

        self.registry.stop_modules().await?;
        self.state.db.close().await;
        served
    }
}
