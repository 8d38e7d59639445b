//! HS256 access/refresh tokens.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use libris_kernel::settings::AuthSettings;

use crate::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by every token this service issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: i64,
    refresh_ttl: i64,
}

/// Issues and validates tokens; cheap to clone.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
}

impl TokenService {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
                decoding: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
                validation,
                access_ttl: i64::try_from(settings.access_token_ttl_secs).unwrap_or(i64::MAX),
                refresh_ttl: i64::try_from(settings.refresh_token_ttl_secs).unwrap_or(i64::MAX),
            }),
        }
    }

    /// Issue a fresh refresh/access pair for a user.
    pub fn issue_pair(&self, user_id: i64, username: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            refresh: self.issue(TokenType::Refresh, user_id, username)?,
            access: self.issue(TokenType::Access, user_id, username)?,
        })
    }

    pub fn issue(
        &self,
        token_type: TokenType,
        user_id: i64,
        username: &str,
    ) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = match token_type {
            TokenType::Access => self.keys.access_ttl,
            TokenType::Refresh => self.keys.refresh_ttl,
        };
        self.sign(&Claims {
            token_type,
            exp: now.saturating_add(ttl),
            iat: now,
            jti: Uuid::new_v4().simple().to_string(),
            user_id,
            username: username.to_string(),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding)
            .map_err(AuthError::InvalidToken)
    }

    /// Decode and check signature and expiry, whatever the token type.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.keys.decoding, &self.keys.validation)
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }

    /// Decode a token that must be an access token.
    pub fn validate_access(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new access token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.decode(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::WrongTokenType);
        }
        self.issue(TokenType::Access, claims.user_id, &claims.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&AuthSettings::default())
    }

    #[test]
    fn pair_round_trips_through_validation() {
        let tokens = service();
        let pair = tokens.issue_pair(7, "reader").unwrap();

        let claims = tokens.validate_access(&pair.access).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.username, "reader");
        assert_eq!(claims.token_type, TokenType::Access);

        assert!(matches!(
            tokens.validate_access(&pair.refresh),
            Err(AuthError::WrongTokenType)
        ));
    }

    #[test]
    fn refresh_issues_access_token() {
        let tokens = service();
        let pair = tokens.issue_pair(3, "reader").unwrap();

        let access = tokens.refresh(&pair.refresh).unwrap();
        assert_eq!(tokens.validate_access(&access).unwrap().user_id, 3);
        assert!(tokens.refresh(&pair.access).is_err());
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let tokens = service();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let expired = tokens
            .sign(&Claims {
                token_type: TokenType::Access,
                exp: now - 10,
                iat: now - 310,
                jti: "expired".to_string(),
                user_id: 1,
                username: "reader".to_string(),
            })
            .unwrap();
        assert!(tokens.decode(&expired).is_err());

        let other = TokenService::new(&AuthSettings {
            jwt_secret: "another-secret".to_string(),
            ..AuthSettings::default()
        });
        let foreign = other.issue(TokenType::Access, 1, "reader").unwrap();
        assert!(tokens.decode(&foreign).is_err());
        assert!(tokens.decode("not.a.jwt").is_err());
    }
}
