use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};
use rand::RngCore;
use crate::errors::ManagerError;

const SALT_LEN: usize = 16;
const OUTPUT_LEN: usize = 32;
pub const DEFAULT_ROUNDS: u32 = 29_000;

/// Hashes a password into a PHC string, `$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`.
pub fn hash_password(password: &str) -> Result<String, ManagerError> {
    hash_password_with(password, DEFAULT_ROUNDS)
}

pub fn hash_password_with(password: &str, rounds: u32) -> Result<String, ManagerError> {
    if rounds == 0 {
        return Err(ManagerError::InvalidArgument("Round count must be positive".into()));
    }
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes)
        .map_err(|e| ManagerError::Internal(format!("Failed to encode salt: {}", e)))?;

    let params = Params { rounds, output_length: OUTPUT_LEN };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(|e| ManagerError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password_with("hunter22", 10).unwrap();
        assert!(stored.starts_with("$pbkdf2-sha256$i=10,l=32$"));
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password_with("same password", 5).unwrap();
        let b = hash_password_with("same password", 5).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same password", &a));
        assert!(verify_password("same password", &b));
    }

    #[test]
    fn test_malformed_hashes_rejected() {
        for stored in [
            "",
            "plaintext",
            "sha256$10$00$00",
            "$md5$i=10$c2FsdHNhbHQ$aGFzaA",
            "$pbkdf2-sha256$i=10,l=32$",
        ] {
            assert!(!verify_password("anything", stored), "{} should not verify", stored);
        }
    }

    #[test]
    fn test_zero_rounds_rejected() {
        assert!(matches!(hash_password_with("pw", 0), Err(ManagerError::InvalidArgument(_))));
    }
}
