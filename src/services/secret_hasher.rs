use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};

#[derive(thiserror::Error, Debug)]
pub enum HasherError {
    #[error("Invalid hash parameters: {0}")]
    InvalidParams(String),

    #[error("Hashing failed: {0}")]
    HashFailed(String),

    #[error("Stored hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Hashing task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// One-way protection for low-entropy secrets such as the CVV
#[async_trait]
pub trait SecretHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<String, HasherError>;

    /// `Ok(false)` on mismatch; `Err` only when the comparison itself could
    /// not run.
    async fn compare(&self, plaintext: &str, hash: &str) -> Result<bool, HasherError>;
}

/// Argon2id work factor. Fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Argon2id hasher producing PHC strings with a random salt per call.
///
/// Hashing is CPU-bound, so both operations run on the blocking pool.
pub struct Argon2Hasher {
    params: Params,
    pepper: Option<Secret<String>>,
}

impl Argon2Hasher {
    pub fn new(cost: HashCost, pepper: Option<Secret<String>>) -> Result<Self, HasherError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| HasherError::InvalidParams(e.to_string()))?;

        Ok(Self { params, pepper })
    }

    fn peppered(&self, plaintext: &str) -> Secret<String> {
        match &self.pepper {
            Some(pepper) => Secret::new(format!("{}{}", pepper.expose_secret(), plaintext)),
            None => Secret::new(plaintext.to_string()),
        }
    }
}

fn argon2id(params: Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

#[async_trait]
impl SecretHasher for Argon2Hasher {
    async fn hash(&self, plaintext: &str) -> Result<String, HasherError> {
        let input = self.peppered(plaintext);
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2id(params)
                .hash_password(input.expose_secret().as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| HasherError::HashFailed(e.to_string()))
        })
        .await?
    }

    async fn compare(&self, plaintext: &str, hash: &str) -> Result<bool, HasherError> {
        let input = self.peppered(plaintext);
        let params = self.params.clone();
        let stored = hash.to_string();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored)
                .map_err(|e| HasherError::MalformedHash(e.to_string()))?;

            match argon2id(params).verify_password(input.expose_secret().as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(HasherError::HashFailed(e.to_string())),
            }
        })
        .await?
    }
}
