//! Password hashing with argon2id.
//!
//! Each hash gets its own random salt and is stored as a PHC string, so the
//! parameters travel with the hash. Verification recomputes the hash and
//! compares in constant time inside the argon2 verifier.
//!
//! Both operations are CPU-bound. The async wrappers move them onto tokio's
//! blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::RegistryError;

/// Hash a plaintext password with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, RegistryError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| RegistryError::Hashing(e.to_string()))
}

/// Check a plaintext password against a stored PHC hash.
///
/// An unparsable stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            tracing::warn!("stored password hash is not a valid PHC string");
            false
        }
    }
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_async(password: String) -> Result<String, RegistryError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| RegistryError::Hashing(e.to_string()))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_async(
    password: String,
    stored_hash: String,
) -> Result<bool, RegistryError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| RegistryError::Hashing(e.to_string()))
}
