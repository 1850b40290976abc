//! Authentication Module
//!
//! Password hashing with bcrypt and signed bearer tokens. Tokens carry only
//! the user id and expire 7 days after issuance; requests present them in
//! the `x-auth-token` header.

pub mod handlers;
pub mod middleware;

use anyhow::Context;
use bcrypt::DEFAULT_COST;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const TOKEN_HEADER: &str = "x-auth-token";

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Signing and verification keys, derived once from the configured secret
/// and shared through app state.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for a user.
    pub fn create_token(&self, user_id: &str) -> anyhow::Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::days(TOKEN_TTL_DAYS))
            .context("valid timestamp")?
            .timestamp();

        let claims = Claims {
            sub: user_id.to_owned(),
            exp: expiration as usize,
        };

        encode(&Header::default(), &claims, &self.encoding).context("failed to sign token")
    }

    /// Verify a token and return the user id it was issued for. Fails on
    /// bad signature and on expiry.
    pub fn verify_token(&self, token: &str) -> anyhow::Result<String> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .context("invalid token")?;
        Ok(data.claims.sub)
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    bcrypt::hash(password, DEFAULT_COST).context("failed to hash password")
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    bcrypt::verify(password, hash).context("failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let keys = TokenKeys::new("test-secret");
        let token = keys.create_token("user-123").unwrap();
        let user_id = keys.verify_token(&token).unwrap();
        assert_eq!(user_id, "user-123");
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let keys = TokenKeys::new("test-secret");
        let other = TokenKeys::new("other-secret");
        let token = keys.create_token("user-123").unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn token_rejects_garbage() {
        let keys = TokenKeys::new("test-secret");
        assert!(keys.verify_token("not-a-token").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("secret123").unwrap();
        assert_ne!(hash, "secret123");
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
