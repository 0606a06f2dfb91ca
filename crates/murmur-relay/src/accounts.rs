// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account input validation, password hashing, and session tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Session tokens are 32 bytes
//! from the system CSPRNG, hex-encoded.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use ring::rand::{SecureRandom, SystemRandom};

use murmur_core::MurmurError;
use murmur_core::types::TIMESTAMP_FORMAT;

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 32;

const TOKEN_BYTES: usize = 32;

pub fn validate_username(username: &str) -> Result<(), MurmurError> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(MurmurError::Validation(format!(
            "username must be 1-{MAX_USERNAME_LEN} characters"
        )));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '-' | '.');
    if !username.chars().all(allowed) {
        return Err(MurmurError::Validation(
            "username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(())
}

/// Shape check only: one `@`, a non-empty local part, and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), MurmurError> {
    let invalid = || MurmurError::Validation(format!("invalid email address: {email}"));
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let domain_ok = !domain.contains('@')
        && domain
            .split('.')
            .filter(|part| !part.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str, min_len: usize) -> Result<(), MurmurError> {
    if password.chars().count() < min_len {
        return Err(MurmurError::Validation(format!(
            "password must be at least {min_len} characters"
        )));
    }
    Ok(())
}

/// Argon2id hasher with fixed cost parameters.
#[derive(Debug, Clone)]
pub struct PasswordHashing {
    params: Params,
}

impl Default for PasswordHashing {
    /// OWASP-recommended Argon2id cost (19 MiB, 2 passes, 1 lane).
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHashing {
    /// Minimal cost, for tests and throwaway databases only.
    pub fn insecure_fast() -> Self {
        let params = Params::new(Params::MIN_M_COST.max(8), 1, 1, None).unwrap_or_default();
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `password` into a PHC string with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, MurmurError> {
        let mut salt = [0u8; 16];
        SystemRandom::new()
            .fill(&mut salt)
            .map_err(|_| MurmurError::Internal("failed to generate password salt".to_string()))?;
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| MurmurError::Internal(format!("failed to encode salt: {e}")))?;
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| MurmurError::Internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Check `password` against a stored PHC string.
    ///
    /// The cost parameters come from the stored hash, so hashes written
    /// with a different cost still verify.
    pub fn verify(&self, password: &str, phc: &str) -> bool {
        match PasswordHash::new(phc) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Generate an opaque session token.
pub fn generate_token() -> Result<String, MurmurError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| MurmurError::Internal("failed to generate session token".to_string()))?;
    Ok(hex::encode(bytes))
}

/// Expiry timestamp `ttl_hours` from now, in the persisted timestamp format.
pub fn expiry_after(ttl_hours: u32) -> String {
    let expires = chrono::Utc::now() + chrono::Duration::hours(i64::from(ttl_hours));
    expires.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a.b-c_d9").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username(&"x".repeat(32)).is_ok());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b+tag@mail.example.org").is_ok());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@localhost").is_err());
        assert!(validate_email("alice@example.").is_err());
        assert!(validate_email("a@b@example.com").is_err());
        assert!(validate_email("al ice@example.com").is_err());
    }

    #[test]
    fn password_length() {
        assert!(validate_password("12345678", 8).is_ok());
        assert!(validate_password("1234567", 8).is_err());
    }

    #[test]
    fn hash_and_verify() {
        let hashing = PasswordHashing::insecure_fast();
        let phc = hashing.hash("correct horse").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(hashing.verify("correct horse", &phc));
        assert!(!hashing.verify("wrong horse", &phc));
        assert!(!hashing.verify("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hashing = PasswordHashing::insecure_fast();
        assert_ne!(hashing.hash("pw").unwrap(), hashing.hash("pw").unwrap());
    }

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token().unwrap();
        let b = generate_token().unwrap();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn expiry_is_in_the_future() {
        let now = murmur_core::types::timestamp_now();
        assert!(expiry_after(1) > now);
    }
}
