//! Bcrypt Password Hasher
//!
//! bcrypt 是 CPU 密集操作，放到 blocking 线程池执行

use async_trait::async_trait;

use crate::application::ports::{AuthError, PasswordHasherPort};

/// Bcrypt Password Hasher
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[async_trait]
impl PasswordHasherPort for BcryptPasswordHasher {
    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();

        let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        match result {
            Ok(valid) => Ok(valid),
            // 损坏的哈希按校验失败处理
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash could not be parsed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = BcryptPasswordHasher::new(4);
        let hash = hasher.hash("s3cretpass").await.unwrap();
        assert_ne!(hash, "s3cretpass");
        assert!(hasher.verify("s3cretpass", &hash).await.unwrap());
        assert!(!hasher.verify("wrongpass1", &hash).await.unwrap());
        assert!(!hasher.verify("s3cretpass", "not-a-hash").await.unwrap());
    }
}
