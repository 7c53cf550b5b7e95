//! One-way hashing and verification for passwords and security-question
//! answers, plus token generation for resets and sessions.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::constants::limits;

/// Hashes a secret with Argon2id using the configured cost parameters.
/// Runs on `spawn_blocking` because Argon2 is CPU-intensive and would stall
/// the async runtime if run inline.
pub async fn hash_secret(secret: &str, config: &SecurityConfig) -> Result<String> {
    let secret = secret.to_string();
    let config = config.clone();

    task::spawn_blocking(move || hash_secret_blocking(&secret, &config))
        .await
        .context("Hashing task panicked")?
}

/// Verifies a candidate against a stored digest. The argon2 crate compares
/// digests in constant time, so a mismatch reveals nothing about how much of
/// the candidate matched.
pub async fn verify_secret(secret: &str, digest: &str) -> Result<bool> {
    let secret = secret.to_string();
    let digest = digest.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&digest)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        let argon2 = Argon2::default();
        Ok::<bool, anyhow::Error>(
            argon2
                .verify_password(secret.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Verification task panicked")?
}

/// Security answers are matched case-insensitively and ignoring surrounding
/// whitespace; normalize before hashing and before verifying.
#[must_use]
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Single-use reset token: 32 random bytes, hex-encoded (64 chars).
#[must_use]
pub fn generate_reset_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; limits::RESET_TOKEN_BYTES] = rng.random();

    bytes.iter().fold(
        String::with_capacity(limits::RESET_TOKEN_BYTES * 2),
        |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02x}");
            acc
        },
    )
}

/// Opaque per-login session token.
#[must_use]
pub fn generate_session_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn hash_secret_blocking(secret: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {e}"))?;

    Ok(hash.to_string())
}
