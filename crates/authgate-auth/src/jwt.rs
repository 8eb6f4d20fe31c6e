//! Session token encoding and decoding

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;

/// Default session lifetime
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Token signing configuration, fixed for the life of the process
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub default_ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            default_ttl,
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (account email)
    pub sub: String,
    /// Account ID
    pub user_id: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    /// Expiration instant, if representable
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// A token is usable only strictly before its expiration instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// A freshly issued token and its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Whole seconds until expiry, never negative
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Why a token string could not be decoded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed token")]
    Malformed,

    #[error("Bad token signature")]
    BadSignature,
}

/// Encodes and decodes signed session tokens
///
/// Decoding verifies the signature only. Expiry is the caller's check, so
/// expired tokens still decode.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
}

impl TokenCodec {
    /// Create a new codec
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            default_ttl: config.default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for an account, expiring `ttl` from now
    pub fn issue(
        &self,
        email: &str,
        account_id: i64,
        ttl: Duration,
    ) -> Result<SessionToken, AuthError> {
        self.issue_at(email, account_id, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        email: &str,
        account_id: i64,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<SessionToken, AuthError> {
        let iat = now.timestamp();
        let exp = iat
            .checked_add(ttl.num_seconds())
            .ok_or_else(|| AuthError::MalformedInput("Token lifetime out of range".to_string()))?;

        let claims = Claims {
            sub: email.to_string(),
            user_id: account_id,
            exp,
            iat,
            jti: Uuid::new_v4().to_string(),
        };

        debug!("Issuing token for account {} ({})", account_id, email);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| AuthError::MalformedInput("Token lifetime out of range".to_string()))?;

        Ok(SessionToken { token, expires_at })
    }

    /// Verify a token's signature and return its claims
    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    DecodeError::BadSignature
                }
                _ => DecodeError::Malformed,
            })
    }
}
