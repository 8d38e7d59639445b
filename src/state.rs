use std::sync::Arc;

use axum::extract::FromRef;
use libris_authz::{PasswordService, TokenService};
use libris_cache::KeyValueCache;
use libris_db::DbPool;
use libris_kernel::settings::{RecommendationSettings, Settings};

/// Shared handles cloned into every module router.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub tokens: TokenService,
    pub passwords: PasswordService,
    pub cache: Arc<dyn KeyValueCache>,
    pub recommendations: RecommendationSettings,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        db: DbPool,
        cache: Arc<dyn KeyValueCache>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            db,
            tokens: TokenService::new(&settings.auth),
            passwords: PasswordService::new(settings.auth.password_memory_kib)?,
            cache,
            recommendations: settings.recommendations.clone(),
        })
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
