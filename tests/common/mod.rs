//! Shared fixtures for integration tests: in-process test doubles for the
//! bank registry and the card store, plus a cheap Argon2 hasher.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::Secret;

use cardhub::models::{Card, CardholderData};
use cardhub::services::bank_validator::{BankValidator, BankValidatorError};
use cardhub::services::card_lifecycle::LifecycleSettings;
use cardhub::services::secret_hasher::{Argon2Hasher, HashCost, HasherError, SecretHasher};
use cardhub::services::{CardService, IdentifierGenerator};
use cardhub::store::{CardStore, MemoryCardStore, StoreError, StoreResult};

pub const REGISTERED_SWIFT: &str = "PICHECU0001";
pub const UNKNOWN_SWIFT: &str = "NOBANKXX001";

/// Registry that knows a fixed set of SWIFT codes
pub struct StaticBanks {
    known: Vec<String>,
}

impl StaticBanks {
    pub fn with(known: &[&str]) -> Self {
        Self {
            known: known.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl BankValidator for StaticBanks {
    async fn is_registered(&self, swift_code: &str) -> Result<bool, BankValidatorError> {
        Ok(self.known.iter().any(|known| known == swift_code))
    }
}

/// Registry that never answers within any reasonable timeout
pub struct SlowBanks(pub Duration);

#[async_trait]
impl BankValidator for SlowBanks {
    async fn is_registered(&self, _swift_code: &str) -> Result<bool, BankValidatorError> {
        tokio::time::sleep(self.0).await;
        Ok(true)
    }
}

/// Registry that cannot be reached
pub struct DownBanks;

#[async_trait]
impl BankValidator for DownBanks {
    async fn is_registered(&self, _swift_code: &str) -> Result<bool, BankValidatorError> {
        Err(BankValidatorError::Unavailable("connection refused".to_string()))
    }

    async fn check_health(&self) -> Result<(), BankValidatorError> {
        Err(BankValidatorError::Unavailable("connection refused".to_string()))
    }
}

/// Wraps a memory store and reports identifier conflicts on the first
/// `conflicts` inserts.
pub struct CollidingStore {
    inner: MemoryCardStore,
    remaining: AtomicU32,
    pub inserts: AtomicU32,
}

impl CollidingStore {
    pub fn new(inner: MemoryCardStore, conflicts: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(conflicts),
            inserts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl CardStore for CollidingStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Card>> {
        self.inner.find_by_code(code).await
    }

    async fn find_by_card_number(&self, card_number: &str) -> StoreResult<Option<Card>> {
        self.inner.find_by_card_number(card_number).await
    }

    async fn find_all(&self) -> StoreResult<Vec<Card>> {
        self.inner.find_all().await
    }

    async fn insert(&self, card: &Card) -> StoreResult<Card> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let left = self.remaining.load(Ordering::SeqCst);
        if left > 0 {
            self.remaining.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict("cards_card_number_key".to_string()));
        }
        self.inner.insert(card).await
    }

    async fn save(&self, card: &Card) -> StoreResult<Card> {
        self.inner.save(card).await
    }

    async fn remove(&self, card: &Card) -> StoreResult<()> {
        self.inner.remove(card).await
    }
}

/// Serves a fixed snapshot on reads while writes go to the real store, as
/// if another request deleted the card right after it was looked up.
pub struct StaleReads {
    inner: MemoryCardStore,
    snapshot: Card,
}

impl StaleReads {
    pub fn new(inner: MemoryCardStore, snapshot: Card) -> Self {
        Self { inner, snapshot }
    }
}

#[async_trait]
impl CardStore for StaleReads {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Card>> {
        Ok((self.snapshot.code == code).then(|| self.snapshot.clone()))
    }

    async fn find_by_card_number(&self, card_number: &str) -> StoreResult<Option<Card>> {
        Ok((self.snapshot.card_number == card_number).then(|| self.snapshot.clone()))
    }

    async fn find_all(&self) -> StoreResult<Vec<Card>> {
        Ok(vec![self.snapshot.clone()])
    }

    async fn insert(&self, card: &Card) -> StoreResult<Card> {
        self.inner.insert(card).await
    }

    async fn save(&self, card: &Card) -> StoreResult<Card> {
        self.inner.save(card).await
    }

    async fn remove(&self, card: &Card) -> StoreResult<()> {
        self.inner.remove(card).await
    }
}

/// Hasher that records how often a CVV comparison was attempted
pub struct CountingHasher {
    inner: Argon2Hasher,
    pub compares: AtomicU32,
}

impl CountingHasher {
    pub fn new() -> Self {
        Self {
            inner: fast_hasher(),
            compares: AtomicU32::new(0),
        }
    }

    pub fn compare_count(&self) -> u32 {
        self.compares.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretHasher for CountingHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, HasherError> {
        self.inner.hash(plaintext).await
    }

    async fn compare(&self, plaintext: &str, hash: &str) -> Result<bool, HasherError> {
        self.compares.fetch_add(1, Ordering::SeqCst);
        self.inner.compare(plaintext, hash).await
    }
}

pub fn fast_hasher() -> Argon2Hasher {
    Argon2Hasher::new(
        HashCost {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        Some(Secret::new("test-pepper".to_string())),
    )
    .unwrap()
}

pub fn settings() -> LifecycleSettings {
    LifecycleSettings {
        bank_timeout: Duration::from_millis(200),
        max_identifier_attempts: 5,
    }
}

pub fn service_with(store: Arc<dyn CardStore>, banks: Arc<dyn BankValidator>) -> CardService {
    service_with_hasher(store, banks, Arc::new(fast_hasher()))
}

pub fn service_with_hasher(
    store: Arc<dyn CardStore>,
    banks: Arc<dyn BankValidator>,
    hasher: Arc<dyn SecretHasher>,
) -> CardService {
    CardService::new(
        store,
        banks,
        hasher,
        IdentifierGenerator::new("5135").unwrap(),
        settings(),
    )
}

/// Service over a fresh memory store whose registry knows [`REGISTERED_SWIFT`]
pub fn service() -> (CardService, MemoryCardStore) {
    let store = MemoryCardStore::new();
    let service = service_with(
        Arc::new(store.clone()),
        Arc::new(StaticBanks::with(&[REGISTERED_SWIFT])),
    );
    (service, store)
}

pub fn holder(swift: &str) -> CardholderData {
    CardholderData {
        bank_swift: swift.to_string(),
        client_doc_type: "DNI".to_string(),
        client_doc_number: "1712345678".to_string(),
        client_name: "Maria Andrade".to_string(),
        client_country: "EC".to_string(),
        client_email: "maria.andrade@example.com".to_string(),
        client_bank_id: "PICH-000042".to_string(),
    }
}
