//! `GET /recommendations`: books near the caller's favorites, cached per user.

pub mod engine;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use utoipa::OpenApi;

use libris_authz::AuthUser;
use libris_http::{extract::Json, AppError};
use libris_kernel::Module;

use super::{books::models::Book, favorites};
use crate::AppState;
use engine::CandidateIndex;

pub struct RecommendationsModule {
    state: AppState,
}

impl RecommendationsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[derive(OpenApi)]
#[openapi(paths(recommendations))]
struct RecommendationsApi;

#[async_trait]
impl Module for RecommendationsModule {
    fn name(&self) -> &'static str {
        "recommendations"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/recommendations", get(recommendations))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(RecommendationsApi::openapi()).ok()
    }
}

/// Cache key holding a user's serialized recommendation list.
pub fn cache_key(user_id: i64) -> String {
    format!("recommendations_{user_id}")
}

fn json_response(body: String) -> Response {
    ([(CONTENT_TYPE, "application/json")], body).into_response()
}

#[utoipa::path(
    get,
    path = "/recommendations",
    tag = "Recommendations",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Up to five books near the caller's favorites, or a message when there are none", body = [Book]),
        (status = 401, description = "Authentication required")
    )
)]
async fn recommendations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    let key = cache_key(user.id);
    if let Some(cached) = state.cache.get(&key).await {
        tracing::debug!(user_id = user.id, "recommendations served from cache");
        return Ok(json_response(cached));
    }

    let favorite_books = favorites::store::books_for_user(&state.db, user.id).await?;
    if favorite_books.is_empty() {
        return Ok(
            Json(json!({ "message": "No favorite books found for recommendations." }))
                .into_response(),
        );
    }

    let candidates = favorites::store::books_excluding_favorites(&state.db, user.id).await?;
    let settings = state.recommendations.clone();
    let picked = tokio::task::spawn_blocking(move || {
        CandidateIndex::build(candidates, &settings)?.recommend(
            &favorite_books,
            settings.neighbors,
            settings.limit,
        )
    })
    .await
    .context("recommendation task failed")?
    .context("failed to compute recommendations")?;

    let body = serde_json::to_string(&picked).context("failed to serialize recommendations")?;
    state
        .cache
        .set(
            &key,
            body.clone(),
            Duration::from_secs(state.recommendations.cache_ttl_secs),
        )
        .await;

    tracing::info!(user_id = user.id, count = picked.len(), "recommendations computed");
    Ok(json_response(body))
}

/// Create a new instance of the recommendations module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(RecommendationsModule::new(state))
}
