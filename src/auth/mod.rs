/*!
 * # Authentication
 *
 * Bearer-token identity for the delivery API. Tokens are HS256 JWTs carrying
 * the user id, role names and, for store staff, the store they work for.
 * Session issuance lives outside this service; `AuthService::issue_token`
 * exists for tooling and tests.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::store;
use crate::errors::ServiceError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,       // User id
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>, // Staff scope
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated requester resolved from the bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub roles: Vec<String>,
    pub store_id: Option<Uuid>,
}

impl AuthUser {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            roles: Vec::new(),
            store_id: None,
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        self
    }

    pub fn with_store(mut self, store_id: Uuid) -> Self {
        self.store_id = Some(store_id);
        self
    }

    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Admins, the store's owner, and staff scoped to the store may manage
    /// its orders.
    pub fn can_manage_store(&self, store: &store::Model) -> bool {
        self.is_admin()
            || store.owner_id == self.user_id
            || (self.has_role(ROLE_STAFF) && self.store_id == Some(store.id))
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(config: &AppConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.jwt_issuer.clone(),
            Duration::from_secs(config.jwt_expiration_secs),
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

/// Issues and validates bearer tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Mint an access token for `user`.
    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.user_id.to_string(),
            roles: user.roles.clone(),
            store_id: user.store_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            roles: claims.roles,
            store_id: claims.store_id,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::MissingAuth)?;
        let user = auth_service.authenticate(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            e
        })?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::store::StoreStatus;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "delivery-api".to_string(),
            Duration::from_secs(3600),
        ))
    }

    fn store(owner_id: Uuid) -> store::Model {
        store::Model {
            id: Uuid::new_v4(),
            name: "Bun Cha Huong Lien".to_string(),
            owner_id,
            status: StoreStatus::Approved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_authenticates_as_the_same_user() {
        let auth = service();
        let store_id = Uuid::new_v4();
        let user = AuthUser::new(Uuid::new_v4())
            .with_role(ROLE_STAFF)
            .with_store(store_id);

        let token = auth.issue_token(&user).unwrap();
        assert_eq!(auth.authenticate(&token).unwrap(), user);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let other = AuthService::new(AuthConfig::new(
            "another_secret_key_that_is_long_enough_1234".to_string(),
            "delivery-api".to_string(),
            Duration::from_secs(3600),
        ));
        let token = other.issue_token(&AuthUser::new(Uuid::new_v4())).unwrap();
        assert_eq!(service().validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert_eq!(
            service().validate_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn store_management_authority() {
        let owner = Uuid::new_v4();
        let s = store(owner);

        assert!(AuthUser::new(owner).can_manage_store(&s));
        assert!(AuthUser::new(Uuid::new_v4())
            .with_role(ROLE_ADMIN)
            .can_manage_store(&s));
        assert!(AuthUser::new(Uuid::new_v4())
            .with_role(ROLE_STAFF)
            .with_store(s.id)
            .can_manage_store(&s));

        assert!(!AuthUser::new(Uuid::new_v4())
            .with_role(ROLE_STAFF)
            .with_store(Uuid::new_v4())
            .can_manage_store(&s));
        assert!(!AuthUser::new(Uuid::new_v4())
            .with_store(s.id)
            .can_manage_store(&s));
    }

    #[test]
    fn auth_errors_map_to_unauthorized() {
        let err: ServiceError = AuthError::MissingAuth.into();
        assert_matches!(err, ServiceError::Unauthorized(_));

        let err: ServiceError = AuthError::TokenCreation("bad key".into()).into();
        assert_matches!(err, ServiceError::InternalError(_));
    }
}
