use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CardStore, StoreError, StoreResult};
use crate::models::Card;

/// In-process card store keyed by card code.
///
/// Enforces the same uniqueness rules as the `cards` table: one card per code
/// and one card per card number.
#[derive(Clone, Default)]
pub struct MemoryCardStore {
    cards: Arc<RwLock<HashMap<String, Card>>>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.cards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.read().await.is_empty()
    }
}

#[async_trait]
impl CardStore for MemoryCardStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Card>> {
        Ok(self.cards.read().await.get(code).cloned())
    }

    async fn find_by_card_number(&self, card_number: &str) -> StoreResult<Option<Card>> {
        Ok(self
            .cards
            .read()
            .await
            .values()
            .find(|card| card.card_number == card_number)
            .cloned())
    }

    async fn find_all(&self) -> StoreResult<Vec<Card>> {
        let mut cards: Vec<Card> = self.cards.read().await.values().cloned().collect();
        cards.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(cards)
    }

    async fn insert(&self, card: &Card) -> StoreResult<Card> {
        let mut cards = self.cards.write().await;

        if cards.contains_key(&card.code) {
            return Err(StoreError::Conflict("cards_pkey".to_string()));
        }
        if cards.values().any(|c| c.card_number == card.card_number) {
            return Err(StoreError::Conflict("cards_card_number_key".to_string()));
        }

        cards.insert(card.code.clone(), card.clone());
        Ok(card.clone())
    }

    async fn save(&self, card: &Card) -> StoreResult<Card> {
        let mut cards = self.cards.write().await;
        let stored = cards
            .get_mut(&card.code)
            .ok_or_else(|| StoreError::NotFound(card.code.clone()))?;

        stored.client_name = card.client_name.clone();
        stored.client_email = card.client_email.clone();
        stored.status = card.status;

        Ok(stored.clone())
    }

    async fn remove(&self, card: &Card) -> StoreResult<()> {
        match self.cards.write().await.remove(&card.code) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(card.code.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardStatus;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn card(code: &str, number: &str) -> Card {
        Card {
            code: code.to_string(),
            bank_swift: "PICHECU0001".to_string(),
            client_doc_type: "DNI".to_string(),
            client_doc_number: "12345678".to_string(),
            client_name: "Juan Perez".to_string(),
            client_country: "EC".to_string(),
            client_email: "juan@example.com".to_string(),
            client_bank_id: "CLIENT123".to_string(),
            card_number: number.to_string(),
            issued_at: Utc.with_ymd_and_hms(2024, 2, 24, 0, 0, 0).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2028, 2, 24).unwrap(),
            cvv_hash: "hashed".to_string(),
            status: CardStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_identifiers() {
        let store = MemoryCardStore::new();
        store
            .insert(&card("AAAAAAAAAA", "5135000000000001"))
            .await
            .unwrap();

        let same_code = store.insert(&card("AAAAAAAAAA", "5135000000000002")).await;
        assert!(matches!(same_code, Err(StoreError::Conflict(_))));

        let same_number = store.insert(&card("BBBBBBBBBB", "5135000000000001")).await;
        assert!(matches!(same_number, Err(StoreError::Conflict(_))));

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_save_only_touches_mutable_fields() {
        let store = MemoryCardStore::new();
        store
            .insert(&card("AAAAAAAAAA", "5135000000000001"))
            .await
            .unwrap();

        let mut changed = card("AAAAAAAAAA", "9999999999999999");
        changed.status = CardStatus::Blocked;
        changed.cvv_hash = "other".to_string();

        let saved = store.save(&changed).await.unwrap();
        assert_eq!(saved.status, CardStatus::Blocked);
        assert_eq!(saved.card_number, "5135000000000001");
        assert_eq!(saved.cvv_hash, "hashed");
    }

    #[tokio::test]
    async fn test_lookup_by_both_keys() {
        let store = MemoryCardStore::new();
        store
            .insert(&card("AAAAAAAAAA", "5135000000000001"))
            .await
            .unwrap();

        assert!(store.find_by_code("AAAAAAAAAA").await.unwrap().is_some());
        assert!(store
            .find_by_card_number("5135000000000001")
            .await
            .unwrap()
            .is_some());
        assert!(store.find_by_code("ZZZZZZZZZZ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_card_reported_on_save_and_remove() {
        let store = MemoryCardStore::new();
        let ghost = card("AAAAAAAAAA", "5135000000000001");

        assert!(matches!(
            store.save(&ghost).await,
            Err(StoreError::NotFound(ref code)) if code == "AAAAAAAAAA"
        ));
        assert!(matches!(
            store.remove(&ghost).await,
            Err(StoreError::NotFound(_))
        ));

        store.insert(&ghost).await.unwrap();
        store.remove(&ghost).await.unwrap();
        assert!(matches!(
            store.remove(&ghost).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
