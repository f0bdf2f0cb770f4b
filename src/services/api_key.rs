// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Developer API key generation.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Length of a generated API key.
pub const API_KEY_LENGTH: usize = 40;

/// Attempts at finding an unused key before giving up.
pub const MAX_KEY_ATTEMPTS: usize = 5;

/// Generate a random alphanumeric API key.
pub fn generate_api_key() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest used to index keys in storage.
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}
