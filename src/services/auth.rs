// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and JWT issuance/verification.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task;

use crate::error::AppError;
use crate::models::User;

/// Access tokens are short-lived; clients re-mint them via the refresh grant.
const ACCESS_TOKEN_TTL_SECS: usize = 2 * 60 * 60;
const REFRESH_TOKEN_TTL_SECS: usize = 30 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user document id)
    pub sub: String,
    /// Email at issuance time
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Credential service: bcrypt hashing plus HS256 session tokens.
#[derive(Clone)]
pub struct AuthService {
    signing_key: Vec<u8>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(signing_key: Vec<u8>, bcrypt_cost: u32) -> Self {
        Self {
            signing_key,
            bcrypt_cost,
        }
    }

    /// Hash a password on the blocking pool (bcrypt is CPU-bound).
    pub async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
    }

    /// Check a password against a stored hash on the blocking pool.
    ///
    /// A malformed stored hash counts as a failed match rather than an error,
    /// so callers uniformly reject with 401.
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let password = password.to_string();
        let hash = hash.to_string();
        let outcome = task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Verify task failed: {}", e)))?;

        Ok(outcome.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored password hash failed to parse");
            false
        }))
    }

    /// Short-lived token used on authenticated requests.
    pub fn issue_access_token(&self, user: &User) -> Result<String, AppError> {
        self.issue_token(user, ACCESS_TOKEN_TTL_SECS)
    }

    /// Long-lived token exchanged for fresh access tokens.
    pub fn issue_refresh_token(&self, user: &User) -> Result<String, AppError> {
        self.issue_token(user, REFRESH_TOKEN_TTL_SECS)
    }

    fn issue_token(&self, user: &User, ttl_secs: usize) -> Result<String, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs() as usize;

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: now,
            exp: now + ttl_secs,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    /// Decode and validate a token (signature + expiry).
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let key = DecodingKey::from_secret(&self.signing_key);
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidToken)
    }
}
