use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::problem::ProblemResponse;
use crate::router::AppState;

/// Verifies bearer tokens issued by the authentication subsystem.
///
/// Signature checking is delegated to `jsonwebtoken`; time-based claims are
/// evaluated here against the application clock so tests can pin "now".
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_aud = false;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AuthClaims, AuthError> {
        let claims = decode::<AuthClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| AuthError::Invalid(format!("{err}")))?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::Invalid("missing_subject".to_string()));
        }
        let now_ts = now.timestamp();
        if let Some(nbf) = claims.nbf {
            if now_ts < nbf {
                return Err(AuthError::Invalid("token_not_yet_valid".to_string()));
            }
        }
        if now_ts >= claims.exp {
            return Err(AuthError::Invalid("token_expired".to_string()));
        }
        Ok(claims)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthClaims {
    pub sub: String,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Authenticated principal extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Option<String>,
}

impl AuthUser {
    /// Staff principals may create notifications for others.
    pub fn is_staff(&self) -> bool {
        matches!(self.role.as_deref(), Some("admin") | Some("staff"))
    }
}

impl From<AuthClaims> for AuthUser {
    fn from(claims: AuthClaims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::Missing)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_token(parts)
            .and_then(|token| state.token_validator().validate(token, state.now()))
            .map_err(|err| {
                debug!(stage = "api", error = %err, path = %parts.uri.path(), "request rejected by auth");
                ProblemResponse::unauthorized()
            })?;
        Ok(claims.into())
    }
}

#[cfg(test)]
pub(crate) fn issue_token(secret: &[u8], sub: &str, role: Option<&str>, exp: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = AuthClaims {
        sub: sub.to_string(),
        role: role.map(str::to_string),
        exp,
        nbf: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .expect("encode token")
}
