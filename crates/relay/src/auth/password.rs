// Argon2id password hashing.
//
// Hashing and verification run on the blocking pool; both are deliberately
// slow and must not stall the async workers.

use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

const DUMMY_PASSWORD: &str = "folio-unknown-account-placeholder";

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Hash `password` into a PHC string with a fresh random salt.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .context("password hashing task failed")?
}

/// Check `password` against a stored PHC string.
///
/// `Ok(false)` on mismatch. A malformed stored hash is an error, not a mismatch.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();
    tokio::task::spawn_blocking(move || verify_blocking(&password, &stored_hash))
        .await
        .context("password verification task failed")?
}

/// Spend one verification worth of work when no account matched, so an unknown
/// email costs about as much as a wrong password.
pub async fn verify_against_dummy(password: &str) {
    let password = password.to_owned();
    let _ = tokio::task::spawn_blocking(move || {
        if let Some(hash) = DUMMY_HASH.get_or_init(|| hash_blocking(DUMMY_PASSWORD).ok()) {
            let _ = verify_blocking(&password, hash);
        }
    })
    .await;
}

fn hash_blocking(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| anyhow!("failed to hash password: {error}"))
}

fn verify_blocking(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|error| anyhow!("invalid password hash: {error}"))?;
    match hasher().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(error) => Err(anyhow!("password verification failed: {error}")),
    }
}

#[cfg(not(test))]
fn hasher() -> Argon2<'static> {
    Argon2::default()
}

// Minimum-cost parameters keep unit tests fast; verification reads the
// parameters from the PHC string either way.
#[cfg(test)]
fn hasher() -> Argon2<'static> {
    use argon2::{Algorithm, Params, Version};

    let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
        .expect("minimum argon2 params should be valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}
