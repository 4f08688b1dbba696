//! Password hashing with Argon2.
//!
//! Digests are PHC strings, so the salt and cost parameters travel with the
//! hash. Comparison happens inside `argon2` in constant time.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::error::{WardenError, WardenResult};

/// Hash a plaintext secret with a fresh random salt.
pub fn hash_password(password: &str) -> WardenResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| WardenError::Internal(format!("Failed to generate salt: {}", e)))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| WardenError::Internal(format!("Failed to encode salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| WardenError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a plaintext secret against a stored digest.
///
/// A digest that does not parse is treated as a mismatch.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::debug!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}
