//! Password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::{config::PasswordConfig, errors::Error};

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl From<&PasswordConfig> for Argon2Params {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            memory_kib: config.argon2_memory_kib,
            iterations: config.argon2_iterations,
            parallelism: config.argon2_parallelism,
        }
    }
}

impl Default for Argon2Params {
    /// Secure defaults for production (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str, params: Argon2Params) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = params.to_argon2()?.hash_password(password.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash password: {e}"),
    })?;

    Ok(hash.to_string())
}

/// Verify a password against a PHC string.
///
/// Verification uses the parameters embedded in the hash itself.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Internal {
        operation: format!("parse password hash: {e}"),
    })?;

    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok())
}

/// [`hash_password`] on a blocking thread, so request handlers don't stall the runtime.
pub async fn hash_password_blocking(password: String, params: Argon2Params) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || hash_password(&password, params))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// [`verify_password`] on a blocking thread.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?
}

/// Enforce the configured password length bounds.
pub fn validate_password(password: &str, config: &PasswordConfig) -> Result<(), Error> {
    let length = password.chars().count();
    if length < config.min_length {
        return Err(Error::bad_request(format!(
            "Password must be at least {} characters",
            config.min_length
        )));
    }
    if length > config.max_length {
        return Err(Error::bad_request(format!(
            "Password must be at most {} characters",
            config.max_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cheap parameters keep the tests fast
    const TEST_PARAMS: Argon2Params = Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("test_password_123", TEST_PARAMS).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_input_different_hashes() {
        let hash1 = hash_password("same_password", TEST_PARAMS).unwrap();
        let hash2 = hash_password("same_password", TEST_PARAMS).unwrap();

        // Salted
        assert_ne!(hash1, hash2);
        assert!(verify_password("same_password", &hash1).unwrap());
        assert!(verify_password("same_password", &hash2).unwrap());
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(Error::Internal { .. })));
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let hash = hash_password_blocking("hunter2hunter2".to_string(), TEST_PARAMS).await.unwrap();
        assert!(verify_password_blocking("hunter2hunter2".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password_blocking("hunter3hunter3".to_string(), hash).await.unwrap());
    }

    #[test]
    fn test_validate_password_length() {
        let config = PasswordConfig::default();

        assert!(validate_password("12345678", &config).is_ok());
        assert!(matches!(validate_password("short", &config), Err(Error::BadRequest { .. })));
        assert!(validate_password(&"x".repeat(129), &config).is_err());
    }
}
