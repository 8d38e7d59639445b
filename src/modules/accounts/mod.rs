//! Registration and token endpoints, backed by `libris-authz`.

pub mod models;
pub mod store;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use utoipa::OpenApi;

use libris_authz::{bearer_token, validate_strength};
use libris_http::{error::field_error, extract::Json, AppError};
use libris_kernel::{Migration, Module};

use crate::{utils::FieldErrors, AppState};
use models::{
    valid_email, valid_username, AccessTokenResponse, LoginRequest, RefreshRequest,
    RegisterRequest, RegisteredUser, TokenPairResponse, USERNAME_MAX_LEN,
};

pub struct AccountsModule {
    state: AppState,
}

impl AccountsModule {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(register, login, refresh_token, verify_token),
    components(schemas(
        RegisterRequest,
        RegisteredUser,
        LoginRequest,
        RefreshRequest,
        TokenPairResponse,
        AccessTokenResponse
    ))
)]
struct AccountsApi;

#[async_trait]
impl Module for AccountsModule {
    fn name(&self) -> &'static str {
        "accounts"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/token/refresh", post(refresh_token))
            .route("/token/verify", get(verify_token))
            .with_state(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(AccountsApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }
}

fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_init",
        up: r#"
            CREATE TABLE users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                username      TEXT NOT NULL UNIQUE,
                email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                date_joined   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
    }]
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Accounts",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisteredUser),
        (status = 400, description = "Validation error")
    )
)]
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>), AppError> {
    let mut errors = FieldErrors::new();

    let username = errors.text("username", request.username, Some(USERNAME_MAX_LEN));
    let email = errors.text("email", request.email, None);
    let password = errors.text("password", request.password, None);
    let password2 = errors.text("password2", request.password2, None);

    if !username.is_empty() {
        if !valid_username(&username) {
            errors.push(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if store::username_taken(&state.db, &username).await? {
            errors.push("username", "A user with that username already exists.");
        }
    }
    if !email.is_empty() {
        if !valid_email(&email) {
            errors.push("email", "Enter a valid email address.");
        } else if store::email_taken(&state.db, &email).await? {
            errors.push("email", "This field must be unique.");
        }
    }
    if !password.is_empty() {
        for problem in validate_strength(&password, &username) {
            errors.push("password", problem);
        }
        if password != password2 {
            errors.push("password", "Password fields didn't match.");
        }
    }
    errors.finish()?;

    let passwords = state.passwords.clone();
    let password_hash = tokio::task::spawn_blocking(move || passwords.hash(&password))
        .await
        .context("password hashing task failed")??;

    // Lost a race with a concurrent registration for the same name or email.
    let Some(user) = store::insert(&state.db, &username, &email, &password_hash).await? else {
        let details = collision_details(&state.db, &username, &email).await?;
        return Err(AppError::validation(details, "Validation failed"));
    };

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            username: user.username,
            email: user.email,
        }),
    ))
}

/// Name the column(s) a rejected insert collided with.
async fn collision_details(
    db: &libris_db::DbPool,
    username: &str,
    email: &str,
) -> anyhow::Result<Vec<Value>> {
    let mut details = Vec::new();
    let email_taken = store::email_taken(db, email).await?;
    // The unique index on username is the only other one on `users`.
    if !email_taken || store::username_taken(db, username).await? {
        details.push(field_error(
            "username",
            "A user with that username already exists.",
        ));
    }
    if email_taken {
        details.push(field_error("email", "This field must be unique."));
    }
    Ok(details)
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Accounts",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Refresh and access tokens", body = TokenPairResponse),
        (status = 401, description = "Unknown user or wrong password")
    )
)]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let rejected = || AppError::unauthorized("No active account found with the given credentials");

    let user = store::find_by_username(&state.db, &request.username)
        .await?
        .ok_or_else(rejected)?;

    let passwords = state.passwords.clone();
    let stored_hash = user.password_hash.clone();
    let verified =
        tokio::task::spawn_blocking(move || passwords.verify(&request.password, &stored_hash))
            .await
            .context("password verification task failed")?;
    if !verified {
        tracing::debug!(user_id = user.id, "login rejected");
        return Err(rejected());
    }

    let pair = state.tokens.issue_pair(user.id, &user.username)?;
    Ok(Json(TokenPairResponse {
        refresh: pair.refresh,
        access: pair.access,
    }))
}

#[utoipa::path(
    post,
    path = "/token/refresh",
    tag = "Accounts",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Refresh token invalid or expired")
    )
)]
async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let access = state
        .tokens
        .refresh(&request.refresh)
        .map_err(|_| AppError::unauthorized("Token is invalid or expired"))?;
    Ok(Json(AccessTokenResponse { access }))
}

/// Report whether the bearer token is a valid access token, echoing its claims.
#[utoipa::path(
    get,
    path = "/token/verify",
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token is valid; claims echoed"),
        (status = 400, description = "Authorization header missing"),
        (status = 401, description = "Invalid token")
    )
)]
async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Authorization header missing" })),
        );
    };

    let claims = header
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| "malformed authorization header".to_string())
        .and_then(|token| {
            state
                .tokens
                .validate_access(token)
                .map_err(|err| err.to_string())
        });

    match claims {
        Ok(claims) => (
            StatusCode::OK,
            Json(json!({ "message": "Token is valid", "payload": claims })),
        ),
        Err(reason) => {
            tracing::debug!(%reason, "token verification failed");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid token" })),
            )
        }
    }
}

/// Create a new instance of the accounts module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AccountsModule::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn users_db() -> libris_db::DbPool {
        let db = libris_db::connect("sqlite::memory:", 1).await.unwrap();
        let owned: Vec<(String, Migration)> = migrations()
            .into_iter()
            .map(|migration| ("accounts".to_string(), migration))
            .collect();
        libris_db::migrate(&db, &owned).await.unwrap();
        store::insert(&db, "bilbo", "bilbo@shire.test", "hash")
            .await
            .unwrap()
            .unwrap();
        db
    }

    fn fields(details: &[Value]) -> Vec<&str> {
        details
            .iter()
            .map(|detail| detail["field"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn rejected_insert_names_the_colliding_column() {
        let db = users_db().await;

        assert!(store::insert(&db, "bilbo", "baggins@shire.test", "hash")
            .await
            .unwrap()
            .is_none());
        let details = collision_details(&db, "bilbo", "baggins@shire.test")
            .await
            .unwrap();
        assert_eq!(fields(&details), vec!["username"]);

        assert!(store::insert(&db, "frodo", "BILBO@shire.test", "hash")
            .await
            .unwrap()
            .is_none());
        let details = collision_details(&db, "frodo", "BILBO@shire.test")
            .await
            .unwrap();
        assert_eq!(fields(&details), vec!["email"]);
        assert_eq!(details[0]["error"], "This field must be unique.");

        let details = collision_details(&db, "bilbo", "bilbo@shire.test")
            .await
            .unwrap();
        assert_eq!(fields(&details), vec!["username", "email"]);
    }
}
