//! Identity collaborator for Libris: password handling, JWT tokens and the
//! [`AuthUser`] request guard.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use thiserror::Error;

use libris_http::AppError;

pub mod password;
pub mod token;

pub use password::{validate_strength, PasswordService};
pub use token::{Claims, TokenPair, TokenService, TokenType};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is invalid or expired: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token has the wrong type")]
    WrongTokenType,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) | AuthError::WrongTokenType => {
                AppError::unauthorized("Given token not valid for any token type")
            }
            AuthError::Hashing(message) => {
                AppError::Internal(anyhow::anyhow!("password hashing failed: {message}"))
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated caller, resolved from a valid access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    TokenService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::unauthorized("Authentication credentials were not provided.")
            })?;

        let token = bearer_token(header)
            .ok_or_else(|| AppError::unauthorized("Authorization header must contain a bearer token"))?;

        let claims = TokenService::from_ref(state).validate_access(token)?;
        Ok(AuthUser {
            id: claims.user_id,
            username: claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use libris_kernel::settings::AuthSettings;

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }

    #[tokio::test]
    async fn extractor_accepts_access_token_only() {
        let tokens = TokenService::new(&AuthSettings::default());
        let pair = tokens.issue_pair(11, "reader").unwrap();

        let (mut parts, _) = Request::builder()
            .header(AUTHORIZATION, format!("Bearer {}", pair.access))
            .body(())
            .unwrap()
            .into_parts();
        let user = AuthUser::from_request_parts(&mut parts, &tokens)
            .await
            .unwrap();
        assert_eq!(user.id, 11);

        let (mut parts, _) = Request::builder()
            .header(AUTHORIZATION, format!("Bearer {}", pair.refresh))
            .body(())
            .unwrap()
            .into_parts();
        let rejected = AuthUser::from_request_parts(&mut parts, &tokens).await;
        assert_eq!(rejected.unwrap_err().status(), StatusCode::UNAUTHORIZED);

        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let missing = AuthUser::from_request_parts(&mut parts, &tokens).await;
        assert_eq!(missing.unwrap_err().status(), StatusCode::UNAUTHORIZED);
    }
}
