//! Card persistence boundary.
//!
//! The lifecycle service only talks to [`CardStore`]; Postgres backs it in
//! production and [`MemoryCardStore`] in tests and database-less local runs.

use async_trait::async_trait;

use crate::models::Card;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCardStore;
pub use postgres::PostgresCardStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// A unique identifier (code or card number) is already taken
    #[error("identifier already in use: {0}")]
    Conflict(String),

    /// The card addressed by code is no longer stored
    #[error("no stored card with code {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored card is malformed: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Card>>;

    async fn find_by_card_number(&self, card_number: &str) -> StoreResult<Option<Card>>;

    async fn find_all(&self) -> StoreResult<Vec<Card>>;

    /// Persists a new card. Fails with [`StoreError::Conflict`] when either
    /// identifier is already present.
    async fn insert(&self, card: &Card) -> StoreResult<Card>;

    /// Persists changes to an existing card, keyed by its code. Fails with
    /// [`StoreError::NotFound`] when the card is gone.
    async fn save(&self, card: &Card) -> StoreResult<Card>;

    /// Deletes a card by its code. Fails with [`StoreError::NotFound`] when
    /// nothing was deleted.
    async fn remove(&self, card: &Card) -> StoreResult<()>;

    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
