pub mod models;
pub mod store;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;
use utoipa::OpenApi;

use libris_authz::AuthUser;
use libris_http::{error::field_error, extract::Json, AppError};
use libris_kernel::{Migration, Module};

use super::books;
use crate::AppState;
use models::{Favorite, FavoriteRequest};
use store::Added;

/// Favorites module: per-user bookmarks on books
pub struct FavoritesModule {
    state: AppState,
}

impl FavoritesModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(add_favorite, remove_favorite),
    components(schemas(Favorite, FavoriteRequest))
)]
struct FavoritesApi;

#[async_trait]
impl Module for FavoritesModule {
    fn name(&self) -> &'static str {
        "favorites"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/favorites", post(add_favorite).delete(remove_favorite))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(FavoritesApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE favorites (
                    id      INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                    book_id INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
                    UNIQUE (user_id, book_id)
                );
                CREATE INDEX favorites_book_id ON favorites (book_id);
                "#,
        }]
    }
}

/// The requested book id, once it is known to exist.
async fn requested_book(state: &AppState, request: FavoriteRequest) -> Result<i64, AppError> {
    let Some(book_id) = request.book_id else {
        return Err(AppError::validation(
            vec![field_error("book_id", "This field is required.")],
            "Validation failed",
        ));
    };

    match books::store::get(&state.db, book_id).await? {
        Some(book) => Ok(book.id),
        None => Err(AppError::not_found("Book not found.")),
    }
}

#[utoipa::path(
    post,
    path = "/favorites",
    tag = "Favorites",
    request_body = FavoriteRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Favorite created", body = Favorite),
        (status = 200, description = "Book was already a favorite"),
        (status = 400, description = "Missing book_id"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Book not found")
    )
)]
async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<FavoriteRequest>,
) -> Result<Response, AppError> {
    let book_id = requested_book(&state, request).await?;

    match store::add(&state.db, user.id, book_id).await? {
        Added::Created(favorite) => {
            tracing::info!(user_id = user.id, book_id, "favorite added");
            Ok((StatusCode::CREATED, Json(favorite)).into_response())
        }
        Added::AlreadyPresent => Ok((
            StatusCode::OK,
            Json(json!({ "detail": "This book is already in your favorites." })),
        )
            .into_response()),
        Added::UnknownUser => Err(AppError::unauthorized("User not found")),
    }
}

#[utoipa::path(
    delete,
    path = "/favorites",
    tag = "Favorites",
    request_body = FavoriteRequest,
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Favorite removed"),
        (status = 400, description = "Missing book_id"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Book not found or not a favorite")
    )
)]
async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<FavoriteRequest>,
) -> Result<StatusCode, AppError> {
    let book_id = requested_book(&state, request).await?;

    if !store::remove(&state.db, user.id, book_id).await? {
        return Err(AppError::not_found("This book is not in your favorites."));
    }
    tracing::info!(user_id = user.id, book_id, "favorite removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Create a new instance of the favorites module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(FavoritesModule::new(state))
}
