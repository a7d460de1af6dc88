//! Password hashing
//!
//! bcrypt with automatic salt generation. Hashing is deliberately expensive,
//! so both directions run on tokio's blocking pool instead of the executor.

/// Cost factor for bcrypt hashing (12 is recommended for production)
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Cost factors bcrypt accepts
pub const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Password hashing error
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Hashing task failed: {0}")]
    Task(String),
}

impl From<bcrypt::BcryptError> for PasswordError {
    fn from(err: bcrypt::BcryptError) -> Self {
        PasswordError::Hashing(err.to_string())
    }
}

impl From<tokio::task::JoinError> for PasswordError {
    fn from(err: tokio::task::JoinError) -> Self {
        PasswordError::Task(err.to_string())
    }
}

/// bcrypt hasher with a fixed cost
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password
    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_owned();
        let cost = self.cost;

        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hash)
    }

    /// Verify a password against a bcrypt hash
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let password = password.to_owned();
        let hash = hash.to_owned();

        let matches =
            tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[tokio::test]
    async fn test_hash_produces_valid_bcrypt_hash() {
        let hash = fast_hasher().hash("my_secure_password123!").await.unwrap();

        assert!(hash.starts_with("$2b$") || hash.starts_with("$2a$") || hash.starts_with("$2y$"));
        assert_eq!(hash.len(), 60);
    }

    #[tokio::test]
    async fn test_cost_outside_range_is_an_error() {
        assert!(BCRYPT_COST_RANGE.contains(&DEFAULT_BCRYPT_COST));

        for cost in [*BCRYPT_COST_RANGE.start() - 1, *BCRYPT_COST_RANGE.end() + 1] {
            let result = PasswordHasher::new(cost).hash("password").await;
            assert!(matches!(result, Err(PasswordError::Hashing(_))));
        }
    }

    #[tokio::test]
    async fn test_hash_is_salted() {
        let hasher = fast_hasher();

        let hash1 = hasher.hash("same_password").await.unwrap();
        let hash2 = hasher.hash("same_password").await.unwrap();

        assert_ne!(hash1, hash2);
    }

    #[tokio::test]
    async fn test_verify_correct_and_incorrect() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct_password").await.unwrap();

        assert!(hasher.verify("correct_password", &hash).await.unwrap());
        assert!(!hasher.verify("wrong_password", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_unicode() {
        let hasher = fast_hasher();
        let hash = hasher.hash("비밀번호_пароль_🔐").await.unwrap();

        assert!(hasher.verify("비밀번호_пароль_🔐", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_invalid_hash_format() {
        let result = fast_hasher().verify("password", "not_a_valid_hash").await;
        assert!(matches!(result, Err(PasswordError::Hashing(_))));
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_BCRYPT_COST);
    }
}
