//! Password hashing and opaque token generation.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use rand::distr::Alphanumeric;

use paytrack_types::AuthError;

/// Length of refresh and password-reset tokens.
pub const TOKEN_LENGTH: usize = 48;

/// Argon2id hash with default parameters that matches no password.
///
/// Login verifies against it when the email is unknown, so both failure
/// paths pay for one Argon2 verification.
pub const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hashes a password with Argon2id and a random salt, returning a PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verifies a password against a stored PHC string.
///
/// A malformed stored hash verifies as false.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generates a random alphanumeric token used as a lookup key.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("s3cret-pass").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong-pass", &hash));
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let a = hash_password("s3cret-pass").unwrap();
        let b = hash_password("s3cret-pass").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "plaintext"));
    }

    #[test]
    fn test_dummy_hash_parses_with_default_cost() {
        let parsed = PasswordHash::new(DUMMY_PASSWORD_HASH).unwrap();
        let params = argon2::Params::try_from(&parsed).unwrap();

        assert_eq!(parsed.algorithm, argon2::Algorithm::Argon2id.ident());
        assert_eq!(params.m_cost(), argon2::Params::DEFAULT_M_COST);
        assert_eq!(params.t_cost(), argon2::Params::DEFAULT_T_COST);
        assert_eq!(params.p_cost(), argon2::Params::DEFAULT_P_COST);
        assert!(!verify_password("hunter22", DUMMY_PASSWORD_HASH));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
