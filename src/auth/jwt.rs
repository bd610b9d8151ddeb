//! Session token generation and validation
//!
//! Session tokens are HS256 JWTs signed with the deployment's shared secret.
//! They are stateless: validity depends only on the signature and the clock.

use crate::{
    config::AppConfig,
    error::{AppError, AuthFailure},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Issuer stamped into every session token
pub const ISSUER: &str = "chirpy";

/// Minimum accepted secret length for HS256
pub const MIN_SECRET_LEN: usize = 32;

/// JWT claims for session tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Issuer
    pub iss: String,

    /// Subject (user ID)
    pub sub: String,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

/// Session token codec
pub struct SessionTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionTokenCodec {
    /// Codec over a raw shared secret
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // expiry is checked by validate_at against an explicit clock
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Create codec from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let secret = config.security.jwt_secret.expose_secret();

        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Config(format!(
                "JWT secret too short (min {} chars)",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self::new(secret.as_bytes()))
    }

    /// Issue a session token for `user_id` valid for `ttl` from now
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, AppError> {
        self.issue_at(user_id, ttl, Utc::now())
    }

    /// Issue a session token as if the current time were `now`
    pub fn issue_at(
        &self,
        user_id: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let ttl = ChronoDuration::from_std(ttl)
            .map_err(|e| AppError::Signing(format!("ttl out of range: {}", e)))?;
        let expiration = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Signing("ttl out of range".to_string()))?;

        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode session token: {:?}", e);
            AppError::Signing(e.to_string())
        })
    }

    /// Validate a session token and return the user it was issued to
    pub fn validate(&self, token: &str) -> Result<Uuid, AppError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a session token as if the current time were `now`
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let failure = match e.kind() {
                    ErrorKind::InvalidSignature => AuthFailure::InvalidSignature,
                    ErrorKind::ExpiredSignature => AuthFailure::Expired,
                    _ => AuthFailure::MalformedToken,
                };
                tracing::debug!(reason = %failure, "Session token validation failed: {:?}", e);
                AppError::Unauthorized(failure)
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            tracing::debug!(exp = claims.exp, "Session token expired");
            return Err(AppError::Unauthorized(AuthFailure::Expired));
        }

        Uuid::parse_str(&claims.sub).map_err(|_| {
            tracing::debug!("Session token subject is not a user id");
            AppError::Unauthorized(AuthFailure::MalformedSubject)
        })
    }
}
