// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and password rules.
//!
//! Hashes are stored as `pbkdf2_sha256$<iterations>$<salt>$<hash>` with
//! base64 salt and hash, so the iteration count can be raised later without
//! invalidating existing hashes.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD_NO_PAD as BASE64, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};
use std::num::NonZeroU32;

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const SCHEME: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const MIN_PASSWORD_LENGTH: usize = 8;

/// Default work factor for new hashes.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// PBKDF2-HMAC-SHA256 password hasher.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher {
    /// Create a hasher producing hashes with the given iteration count.
    /// A count of zero is bumped to one.
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
            rng: SystemRandom::new(),
        }
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate salt")))?;

        let mut hash = [0u8; digest::SHA256_OUTPUT_LEN];
        pbkdf2::derive(
            ALGORITHM,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );

        Ok(format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            BASE64.encode(salt),
            BASE64.encode(hash)
        ))
    }

    /// Check a password against an encoded hash. Malformed hashes never match.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Some((iterations, salt, hash)) = decode(encoded) else {
            tracing::warn!("Malformed password hash");
            return false;
        };
        pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok()
    }

    /// Check a password against a stored hash, if there is one.
    ///
    /// With no stored hash the same key derivation still runs, so an unknown
    /// account takes as long to reject as a wrong password.
    pub fn check(&self, password: &str, encoded: Option<&str>) -> bool {
        match encoded {
            Some(encoded) => self.verify(password, encoded),
            None => {
                let mut discard = [0u8; digest::SHA256_OUTPUT_LEN];
                pbkdf2::derive(
                    ALGORITHM,
                    self.iterations,
                    &[0u8; SALT_LEN],
                    password.as_bytes(),
                    &mut discard,
                );
                false
            }
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing task failed: {}", e)))?
    }

    /// [`check`](Self::check) on the blocking thread pool.
    pub async fn check_blocking(
        &self,
        password: String,
        encoded: Option<String>,
    ) -> Result<bool, AppError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.check(&password, encoded.as_deref()))
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Password check task failed: {}", e))
            })
    }
}

fn decode(encoded: &str) -> Option<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations = NonZeroU32::new(parts.next()?.parse().ok()?)?;
    let salt = BASE64.decode(parts.next()?).ok()?;
    let hash = BASE64.decode(parts.next()?).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((iterations, salt, hash))
}

/// Check password strength rules. Returns the list of violated rules.
pub fn password_problems(password: &str, username: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        problems.push("The password is too similar to the username.".to_string());
    }
    problems
}
