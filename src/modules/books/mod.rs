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
use time::OffsetDateTime;
use utoipa::{IntoParams, OpenApi};

use libris_authz::AuthUser;
use libris_http::{error::field_error, extract::Json, AppError};
use libris_kernel::{InitCtx, Migration, Module};

use super::authors;
use crate::AppState;
use models::{Book, BookPayload, NewBook};

/// Books module: catalog CRUD and text search
pub struct BooksModule {
    state: AppState,
}

impl BooksModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(list_books, search_books, create_book, get_book, update_book, patch_book, delete_book),
    components(schemas(Book, BookPayload))
)]
struct BooksApi;

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(ctx.db)
            .await?;
        tracing::info!(module = self.name(), books = count, "books module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/books", get(list_books).post(create_book))
            .route(
                "/books/{id}",
                get(get_book)
                    .put(update_book)
                    .patch(patch_book)
                    .delete(delete_book),
            )
            .route("/search", get(search_books))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(BooksApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE books (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    title            TEXT    NOT NULL,
                    description      TEXT    NOT NULL,
                    author_id        INTEGER NOT NULL REFERENCES authors (id) ON DELETE CASCADE,
                    publication_date TEXT,
                    average_rating   REAL,
                    ratings_count    INTEGER
                );
                CREATE INDEX books_title ON books (title);
                CREATE INDEX books_author_id ON books (author_id);
                CREATE INDEX books_publication_date ON books (publication_date);
                CREATE INDEX books_average_rating ON books (average_rating);
                CREATE INDEX books_ratings_count ON books (ratings_count);
                "#,
        },
        Migration {
            id: "002_title_folded",
            up: r#"
                ALTER TABLE books ADD COLUMN title_folded TEXT NOT NULL DEFAULT '';
                UPDATE books SET title_folded = lower(title);
                CREATE INDEX books_title_folded ON books (title_folded);
                "#,
        }]
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the title or the author's name
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/books",
    tag = "Books",
    params(SearchQuery),
    responses((status = 200, description = "List of books", body = [Book]))
)]
async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    let books = store::search(&state.db, query.search.as_deref()).await?;
    Ok(Json(books))
}

/// Same filter as `GET /books`, exposed as a standalone read-only endpoint.
#[utoipa::path(
    get,
    path = "/search",
    tag = "Books",
    params(SearchQuery),
    responses((status = 200, description = "Matching books", body = [Book]))
)]
async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    let books = store::search(&state.db, query.search.as_deref()).await?;
    tracing::debug!(
        search = query.search.as_deref().unwrap_or_default(),
        hits = books.len(),
        "book search"
    );
    Ok(Json(books))
}

#[utoipa::path(
    post,
    path = "/books",
    tag = "Books",
    request_body = BookPayload,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required")
    )
)]
async fn create_book(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let new_book = payload.resolve(None, false, today())?;
    ensure_author(&state, &new_book).await?;

    let book = store::insert(&state.db, &new_book).await?;
    tracing::info!(book_id = book.id, user_id = user.id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found")
    )
)]
async fn get_book(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Book>, AppError> {
    store::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Book not found."))
}

#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    request_body = BookPayload,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Book replaced", body = Book),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Book not found")
    )
)]
async fn update_book(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<Book>, AppError> {
    save(&state, id, payload, false).await
}

#[utoipa::path(
    patch,
    path = "/books/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    request_body = BookPayload,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Book not found")
    )
)]
async fn patch_book(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<Book>, AppError> {
    save(&state, id, payload, true).await
}

async fn save(
    state: &AppState,
    id: i64,
    payload: BookPayload,
    partial: bool,
) -> Result<Json<Book>, AppError> {
    let stored = store::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;
    let changes = payload.resolve(Some(&stored), partial, today())?;
    ensure_author(state, &changes).await?;

    store::update(&state.db, id, &changes)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Book not found."))
}

#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Book not found")
    )
)]
async fn delete_book(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !store::delete(&state.db, id).await? {
        return Err(AppError::not_found("Book not found."));
    }
    tracing::info!(book_id = id, user_id = user.id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_author(state: &AppState, book: &NewBook) -> Result<(), AppError> {
    if authors::store::exists(&state.db, book.author_id).await? {
        return Ok(());
    }
    Err(AppError::validation(
        vec![field_error(
            "author",
            format!("Invalid pk \"{}\" - object does not exist.", book.author_id),
        )],
        "Validation failed",
    ))
}

fn today() -> time::Date {
    OffsetDateTime::now_utc().date()
}

/// Create a new instance of the books module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(state))
}
