//! Share-link tokens and link passwords.
//!
//! Tokens are handed out once and only their SHA-256 digest is stored.
//! Link passwords are stored as Argon2id PHC strings.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::ServiceError;

const TOKEN_LENGTH: usize = 40;

/// A fresh share token and the digest to store for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkToken {
    pub token: String,
    pub token_hash: String,
}

impl LinkToken {
    pub fn generate() -> Self {
        let token: String = rand::rng()
            .sample_iter(&rand::distr::Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        let token_hash = hash_token(&token);
        Self { token, token_hash }
    }
}

/// Hex SHA-256 of a share token, the form looked up in the link tables.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Password(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::Password(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ServiceError::Password(e.to_string())),
    }
}

/// State shared by file and folder share links.
pub(crate) struct LinkState<'a> {
    pub share_id: &'a str,
    pub expires_dt: Option<DateTime<Utc>>,
    pub revoked_dt: Option<DateTime<Utc>>,
    pub password_hash: Option<&'a str>,
}

impl LinkState<'_> {
    /// Refuse revoked or expired links, then check the password of a
    /// protected one.
    pub fn admit(&self, password: Option<&str>, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if self.revoked_dt.is_some() {
            return Err(ServiceError::LinkUnavailable {
                id: self.share_id.to_string(),
                reason: "revoked",
            });
        }
        if self.expires_dt.is_some_and(|expires| expires <= now) {
            return Err(ServiceError::LinkUnavailable {
                id: self.share_id.to_string(),
                reason: "expired",
            });
        }
        let Some(hash) = self.password_hash else {
            return Ok(());
        };
        match password {
            Some(password) if verify_password(password, hash)? => Ok(()),
            _ => {
                tracing::warn!(share_id = self.share_id, "share link password rejected");
                Err(ServiceError::access_denied("share link", self.share_id))
            }
        }
    }
}
