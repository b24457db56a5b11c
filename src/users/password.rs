//! Password hashing. Only the Argon2id PHC string is ever stored.

use argon2::Argon2;
use argon2::password_hash::{self, PasswordHasher, SaltString};
use rand::Rng;

/// Hash a password with a fresh random salt into a PHC string
/// (`$argon2id$v=19$...`).
///
/// # Errors
///
/// Fails only if the salt cannot be encoded or the hasher rejects its input.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string. Malformed strings never verify.
#[cfg(test)]
pub fn verify_password(stored: &str, password: &str) -> bool {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    PasswordHash::new(stored).is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
