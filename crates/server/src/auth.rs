//! Signed bearer tokens for sessions and password resets.
//!
//! Tokens are HS256 JWTs carrying the user id, a purpose and a random `jti`.
//! Logging out and confirming a reset revoke the `jti` until the token would
//! have expired anyway.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use probmark_core::domain::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthSettings;
use crate::repository::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    PasswordReset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token has expired")]
    Expired,

    #[error("token has been revoked")]
    Revoked,

    #[error("token was issued for a different purpose")]
    WrongPurpose,

    #[error("token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    session_ttl_secs: i64,
    reset_ttl_secs: i64,
    /// Revoked `jti` values and their expiry.
    revoked: Mutex<HashMap<String, i64>>,
}

impl TokenService {
    pub fn new(secret: &[u8], session_ttl_secs: u64, reset_ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            session_ttl_secs: i64::try_from(session_ttl_secs).unwrap_or(i64::MAX),
            reset_ttl_secs: i64::try_from(reset_ttl_secs).unwrap_or(i64::MAX),
            revoked: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        let secret = match &settings.secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("no auth secret configured, generating one; tokens will not survive a restart");
                format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
            }
        };

        Self::new(
            secret.as_bytes(),
            settings.session_ttl_secs,
            settings.reset_ttl_secs,
        )
    }

    pub fn issue(&self, user_id: UserId, purpose: TokenPurpose) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, purpose, Utc::now().timestamp())
    }

    fn issue_at(
        &self,
        user_id: UserId,
        purpose: TokenPurpose,
        issued_at: i64,
    ) -> Result<IssuedToken, AuthError> {
        let ttl = match purpose {
            TokenPurpose::Session => self.session_ttl_secs,
            TokenPurpose::PasswordReset => self.reset_ttl_secs,
        };
        let claims = Claims {
            sub: user_id.into_inner(),
            purpose,
            iat: issued_at,
            exp: issued_at.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::Signing)?;
        Ok(IssuedToken { token, claims })
    }

    /// Checks signature, expiry, purpose and revocation.
    pub async fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| {
                if matches!(err.kind(), ErrorKind::ExpiredSignature) {
                    AuthError::Expired
                } else {
                    AuthError::Invalid(err)
                }
            })?
            .claims;

        if claims.purpose != purpose {
            return Err(AuthError::WrongPurpose);
        }
        if self.revoked.lock().await.contains_key(&claims.jti) {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    /// Returns `false` when `claims` were already revoked, so callers can use
    /// it to consume a single-use token.
    pub async fn revoke(&self, claims: &Claims) -> bool {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.lock().await;
        revoked.retain(|_, expires_at| *expires_at >= now);

        let newly_revoked = revoked.insert(claims.jti.clone(), claims.exp).is_none();
        debug!(user_id = claims.sub, newly_revoked, "token revoked");
        newly_revoked
    }
}

/// Delivers password-reset tokens to their owner.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(&self, user: &UserRecord, token: &IssuedToken) -> anyhow::Result<()>;
}

/// Writes the reset link to the log instead of sending mail.
pub struct LogResetNotifier {
    reset_url: String,
}

impl LogResetNotifier {
    pub fn new(reset_url: impl Into<String>) -> Self {
        Self {
            reset_url: reset_url.into(),
        }
    }
}

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn send_reset(&self, user: &UserRecord, token: &IssuedToken) -> anyhow::Result<()> {
        info!(
            user_id = %user.id,
            email = %user.email,
            expires_at = token.claims.exp,
            "password reset requested"
        );
        debug!(link = %format!("{}?token={}", self.reset_url, token.token), "password reset link");
        Ok(())
    }
}
