use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a teacher PIN with Argon2id. The salt is embedded in the PHC string.
///
/// The hash only supports later verification; the PIN cannot be recovered.
pub fn hash_pin(pin: &str) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash PIN: {}", e))
}

/// Check a PIN against a stored hash. Malformed hashes never verify.
pub fn verify_pin(pin: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(pin.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored PIN hash is not a valid PHC string");
            false
        }
    }
}
