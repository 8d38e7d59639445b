pub mod models;
pub mod store;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

use libris_authz::AuthUser;
use libris_http::{extract::Json, AppError};
use libris_kernel::{InitCtx, Migration, Module};

use crate::AppState;
use models::{Author, AuthorPayload};

/// Authors module: CRUD over catalog authors
pub struct AuthorsModule {
    state: AppState,
}

impl AuthorsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(list_authors, create_author, get_author, update_author, patch_author, delete_author),
    components(schemas(Author, AuthorPayload))
)]
struct AuthorsApi;

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/authors", get(list_authors).post(create_author))
            .route(
                "/authors/{id}",
                get(get_author)
                    .put(update_author)
                    .patch(patch_author)
                    .delete(delete_author),
            )
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(AuthorsApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE authors (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    name           TEXT    NOT NULL,
                    ratings_count  INTEGER,
                    average_rating REAL,
                    about          TEXT    NOT NULL
                );
                CREATE INDEX authors_name ON authors (name);
                CREATE INDEX authors_ratings_count ON authors (ratings_count);
                CREATE INDEX authors_average_rating ON authors (average_rating);
                "#,
        },
        Migration {
            id: "002_name_folded",
            up: r#"
                ALTER TABLE authors ADD COLUMN name_folded TEXT NOT NULL DEFAULT '';
                UPDATE authors SET name_folded = lower(name);
                CREATE INDEX authors_name_folded ON authors (name_folded);
                "#,
        }]
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorQuery {
    /// Case-insensitive substring of the author's name
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/authors",
    tag = "Authors",
    params(AuthorQuery),
    responses((status = 200, description = "List of authors", body = [Author]))
)]
async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<AuthorQuery>,
) -> Result<Json<Vec<Author>>, AppError> {
    let authors = store::list(&state.db, query.search.as_deref()).await?;
    Ok(Json(authors))
}

#[utoipa::path(
    post,
    path = "/authors",
    tag = "Authors",
    request_body = AuthorPayload,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required")
    )
)]
async fn create_author(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AuthorPayload>,
) -> Result<(StatusCode, Json<Author>), AppError> {
    let new_author = payload.resolve(None, false)?;
    let author = store::insert(&state.db, &new_author).await?;
    tracing::info!(author_id = author.id, user_id = user.id, "author created");
    Ok((StatusCode::CREATED, Json(author)))
}

#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "Authors",
    params(("id" = i64, Path, description = "Author id")),
    responses(
        (status = 200, description = "Author", body = Author),
        (status = 404, description = "Author not found")
    )
)]
async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Author>, AppError> {
    store::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Author not found."))
}

#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "Authors",
    params(("id" = i64, Path, description = "Author id")),
    request_body = AuthorPayload,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Author replaced", body = Author),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Author not found")
    )
)]
async fn update_author(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<AuthorPayload>,
) -> Result<Json<Author>, AppError> {
    save(&state, id, payload, false).await
}

#[utoipa::path(
    patch,
    path = "/authors/{id}",
    tag = "Authors",
    params(("id" = i64, Path, description = "Author id")),
    request_body = AuthorPayload,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Author not found")
    )
)]
async fn patch_author(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<AuthorPayload>,
) -> Result<Json<Author>, AppError> {
    save(&state, id, payload, true).await
}

async fn save(
    state: &AppState,
    id: i64,
    payload: AuthorPayload,
    partial: bool,
) -> Result<Json<Author>, AppError> {
    let stored = store::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Author not found."))?;
    let changes = payload.resolve(Some(&stored), partial)?;

    store::update(&state.db, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Author not found."))
}

#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "Authors",
    params(("id" = i64, Path, description = "Author id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Author and their books deleted"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Author not found")
    )
)]
async fn delete_author(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !store::delete(&state.db, id).await? {
        return Err(AppError::not_found("Author not found."));
    }
    tracing::info!(author_id = id, user_id = user.id, "author deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Create a new instance of the authors module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthorsModule::new(state))
}
