use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::models::{Caller, Role};
use crate::AppState;

// --- Error Types ---

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing or invalid authorization header")]
    MissingOrInvalidHeaders,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("Staff or admin role required")]
    Forbidden,

    #[error("Internal server error during authentication")]
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingOrInvalidHeaders
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::UnknownRole(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// --- Identity Resolution ---

/// Turns request credentials into a verified caller.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Result<Caller, AuthError>;
}

/// Claims carried by access tokens minted by the account service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

/// HS256 bearer-token resolver.
#[derive(Clone)]
pub struct JwtResolver {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtResolver {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Mints a token. Used by the seed binary and tests; production tokens
    /// come from the account service sharing the same secret.
    pub fn issue_token(&self, user_id: &str, role: Role, ttl: Duration) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::InternalError)?
            .as_secs();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            iat: now,
            exp: now + ttl.as_secs(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| AuthError::InternalError)
    }

    pub fn verify(&self, token: &str) -> Result<Caller, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })?;
        let role: Role = data
            .claims
            .role
            .parse()
            .map_err(|_| AuthError::UnknownRole(data.claims.role.clone()))?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(Caller::new(data.claims.sub, role))
    }
}

impl IdentityResolver for JwtResolver {
    fn resolve(&self, headers: &HeaderMap) -> Result<Caller, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingOrInvalidHeaders)?
            .to_str()
            .map_err(|_| AuthError::MissingOrInvalidHeaders)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingOrInvalidHeaders)?;
        self.verify(token)
    }
}

// --- Authenticated User Extractor ---

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Several extractors may run on one request.
        if let Some(cached) = parts.extensions.get::<Result<AuthenticatedUser, AuthError>>() {
            return cached.clone();
        }

        let app_state = AppState::from_ref(state);
        let result = app_state.identity.resolve(&parts.headers).map(AuthenticatedUser);
        if let Err(e) = &result {
            tracing::debug!(error = %e, "Rejected request credentials");
        }

        parts.extensions.insert(result.clone());
        result
    }
}

// --- Staff User Extractor ---

/// A caller holding the staff or admin role.
#[derive(Debug, Clone)]
pub struct StaffUser(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(caller) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if caller.role.can_moderate() {
            Ok(StaffUser(caller))
        } else {
            tracing::warn!(caller_id = %caller.id, "Staff access denied");
            Err(AuthError::Forbidden)
        }
    }
}
