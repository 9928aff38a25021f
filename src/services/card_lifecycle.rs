use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use secrecy::{ExposeSecret, Secret};

use crate::models::{
    card::{self, Card, CardStatus, CardholderData},
    patch::CardPatch,
};
use crate::services::bank_validator::{BankValidator, BankValidatorError};
use crate::services::identifier::IdentifierGenerator;
use crate::services::secret_hasher::{HasherError, SecretHasher};
use crate::store::{CardStore, StoreError};

pub const VALID_MESSAGE: &str = "card is valid";
pub const INVALID_MESSAGE: &str = "credentials incorrect";

const BANK_REGISTRY: &str = "bank registry";
const SECRET_HASHER: &str = "secret hasher";

#[derive(thiserror::Error, Debug)]
pub enum CardError {
    #[error("Card not found: {0}")]
    NotFound(CardKey),

    #[error("Bank {swift} is not registered")]
    BankNotRegistered { swift: String },

    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable {
        service: &'static str,
        reason: String,
    },

    #[error("{service} did not answer in time")]
    UpstreamTimeout { service: &'static str },

    #[error("No unique card identifiers after {attempts} attempts")]
    IdentifierExhausted { attempts: u32 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// The two exact-match keys a card can be resolved by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardKey {
    Code(String),
    Number(String),
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardKey::Code(code) => write!(f, "code {}", code),
            CardKey::Number(number) => {
                let tail = number.get(number.len().saturating_sub(4)..).unwrap_or("");
                write!(f, "number ending {}", tail)
            }
        }
    }
}

/// A freshly issued card together with its one-time plaintext CVV
#[derive(Debug)]
pub struct IssuedCard {
    pub card: Card,
    pub cvv: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateCardRequest {
    pub key: CardKey,
    pub patch: CardPatch,
}

pub struct ValidateCardRequest {
    pub card_number: String,
    pub cvv: Secret<String>,
    pub expiry_date: NaiveDate,
}

/// Outcome of a credential check.
///
/// `NotFound` stays distinct for callers that care, but carries the same
/// message as `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardValidation {
    Valid,
    Invalid,
    NotFound,
}

impl CardValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, CardValidation::Valid)
    }

    pub fn message(&self) -> &'static str {
        match self {
            CardValidation::Valid => VALID_MESSAGE,
            CardValidation::Invalid | CardValidation::NotFound => INVALID_MESSAGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Upper bound on a single bank registry call
    pub bank_timeout: Duration,
    /// Identifier generations tried before giving up on collisions
    pub max_identifier_attempts: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            bank_timeout: Duration::from_secs(3),
            max_identifier_attempts: 5,
        }
    }
}

/// Owner of every card business rule: issuance, lookup, partial update,
/// removal and credential validation.
pub struct CardService {
    store: Arc<dyn CardStore>,
    banks: Arc<dyn BankValidator>,
    hasher: Arc<dyn SecretHasher>,
    generator: IdentifierGenerator,
    settings: LifecycleSettings,
}

impl CardService {
    pub fn new(
        store: Arc<dyn CardStore>,
        banks: Arc<dyn BankValidator>,
        hasher: Arc<dyn SecretHasher>,
        generator: IdentifierGenerator,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            banks,
            hasher,
            generator,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn CardStore> {
        &self.store
    }

    pub fn bank_validator(&self) -> &Arc<dyn BankValidator> {
        &self.banks
    }

    /// Issues a new card
    ///
    /// 1. Confirms the issuing bank with the registry (bounded by a timeout)
    /// 2. Generates code, card number and CVV
    /// 3. Fixes issue and expiry dates
    /// 4. Hashes the CVV and inserts the record, regenerating identifiers on
    ///    collision
    /// 5. Returns the stored card with the plaintext CVV, which is never
    ///    available again
    #[tracing::instrument(skip(self, request), fields(bank_swift = %request.bank_swift))]
    pub async fn create(&self, request: CardholderData) -> Result<IssuedCard, CardError> {
        let start_time = Instant::now();

        self.ensure_bank_registered(&request.bank_swift).await?;
        tracing::debug!("Issuing bank confirmed");

        let issued_at = Utc::now();
        let expiry_date = card::expiry_for(issued_at);
        let attempts = self.settings.max_identifier_attempts.max(1);

        for attempt in 1..=attempts {
            let ids = {
                let mut rng = rand::thread_rng();
                self.generator.generate(&mut rng)
            };

            let cvv_hash = self
                .hasher
                .hash(ids.cvv.expose_secret())
                .await
                .map_err(hasher_unavailable)?;

            let candidate = Card {
                code: ids.code,
                bank_swift: request.bank_swift.clone(),
                client_doc_type: request.client_doc_type.clone(),
                client_doc_number: request.client_doc_number.clone(),
                client_name: request.client_name.clone(),
                client_country: request.client_country.clone(),
                client_email: request.client_email.clone(),
                client_bank_id: request.client_bank_id.clone(),
                card_number: ids.card_number,
                issued_at,
                expiry_date,
                cvv_hash,
                status: CardStatus::Active,
            };

            match self.store.insert(&candidate).await {
                Ok(card) => {
                    tracing::info!(
                        card_code = %card.code,
                        expiry_date = %card.expiry_date,
                        attempt,
                        duration_ms = start_time.elapsed().as_millis(),
                        "Card created successfully"
                    );
                    return Ok(IssuedCard { card, cvv: ids.cvv });
                }
                Err(StoreError::Conflict(constraint)) => {
                    tracing::warn!(
                        attempt,
                        constraint = %constraint,
                        "Generated identifier already in use, regenerating"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(attempts, "Exhausted identifier generation attempts");
        Err(CardError::IdentifierExhausted { attempts })
    }

    pub async fn list(&self) -> Result<Vec<Card>, CardError> {
        let cards = self.store.find_all().await?;
        tracing::debug!(count = cards.len(), "Listed cards");
        Ok(cards)
    }

    pub async fn lookup_by_code(&self, code: &str) -> Result<Card, CardError> {
        self.lookup(&CardKey::Code(code.to_string())).await
    }

    pub async fn lookup_by_card_number(&self, card_number: &str) -> Result<Card, CardError> {
        self.lookup(&CardKey::Number(card_number.to_string())).await
    }

    pub async fn lookup(&self, key: &CardKey) -> Result<Card, CardError> {
        let found = match key {
            CardKey::Code(code) => self.store.find_by_code(code).await?,
            CardKey::Number(number) => self.store.find_by_card_number(number).await?,
        };

        found.ok_or_else(|| {
            tracing::debug!(key = %key, "Card not found");
            CardError::NotFound(key.clone())
        })
    }

    /// Applies the fields present in the patch; everything else is kept.
    /// Any status may follow any other.
    #[tracing::instrument(skip(self, request), fields(key = %request.key))]
    pub async fn update(&self, request: UpdateCardRequest) -> Result<Card, CardError> {
        let mut card = self.lookup(&request.key).await?;
        let previous_status = card.status;

        let written = request.patch.apply(&mut card);
        if written == 0 {
            tracing::debug!(card_code = %card.code, "Empty patch, nothing to save");
            return Ok(card);
        }

        let key = request.key;
        let card = self.store.save(&card).await.map_err(|e| match e {
            StoreError::NotFound(_) => CardError::NotFound(key),
            other => CardError::Store(other),
        })?;

        tracing::info!(
            card_code = %card.code,
            from_status = %previous_status,
            to_status = %card.status,
            fields_written = written,
            "Card updated"
        );

        Ok(card)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, code: &str) -> Result<(), CardError> {
        let card = self.lookup_by_code(code).await?;
        self.store.remove(&card).await.map_err(|e| match e {
            StoreError::NotFound(_) => CardError::NotFound(CardKey::Code(card.code.clone())),
            other => CardError::Store(other),
        })?;

        tracing::info!(card_code = %card.code, "Card removed");
        Ok(())
    }

    /// Credential check for card use
    ///
    /// Checks run in a fixed order and stop at the first failure: status,
    /// then exact expiry date, then CVV against the stored hash. Every
    /// failure yields the same generic outcome.
    #[tracing::instrument(skip(self, request))]
    pub async fn validate(
        &self,
        request: ValidateCardRequest,
    ) -> Result<CardValidation, CardError> {
        let card = match self
            .store
            .find_by_card_number(&request.card_number)
            .await?
        {
            Some(card) => card,
            None => {
                tracing::info!("Validation requested for unknown card number");
                return Ok(CardValidation::NotFound);
            }
        };

        if !card.is_active() {
            tracing::info!(card_code = %card.code, status = %card.status, "Card rejected: not active");
            return Ok(CardValidation::Invalid);
        }

        if card.expiry_date != request.expiry_date {
            tracing::info!(card_code = %card.code, "Card rejected: expiry date mismatch");
            return Ok(CardValidation::Invalid);
        }

        let result = match self
            .hasher
            .compare(request.cvv.expose_secret(), &card.cvv_hash)
            .await
        {
            Ok(true) => CardValidation::Valid,
            Ok(false) => {
                tracing::info!(card_code = %card.code, "Card rejected: CVV mismatch");
                CardValidation::Invalid
            }
            Err(e) => {
                tracing::warn!(card_code = %card.code, error = %e, "CVV comparison failed, treating as invalid");
                CardValidation::Invalid
            }
        };

        if result.is_valid() {
            tracing::info!(card_code = %card.code, "Card validated successfully");
        }

        Ok(result)
    }

    async fn ensure_bank_registered(&self, swift_code: &str) -> Result<(), CardError> {
        let lookup = tokio::time::timeout(
            self.settings.bank_timeout,
            self.banks.is_registered(swift_code),
        )
        .await;

        match lookup {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => {
                tracing::warn!(bank_swift = %swift_code, "Bank not registered");
                Err(CardError::BankNotRegistered {
                    swift: swift_code.to_string(),
                })
            }
            Ok(Err(BankValidatorError::Timeout)) | Err(_) => {
                tracing::error!(
                    timeout_ms = self.settings.bank_timeout.as_millis(),
                    "Bank registry timed out"
                );
                Err(CardError::UpstreamTimeout {
                    service: BANK_REGISTRY,
                })
            }
            Ok(Err(BankValidatorError::Unavailable(reason))) => {
                tracing::error!(reason = %reason, "Bank registry unavailable");
                Err(CardError::UpstreamUnavailable {
                    service: BANK_REGISTRY,
                    reason,
                })
            }
        }
    }
}

fn hasher_unavailable(err: HasherError) -> CardError {
    tracing::error!(error = %err, "CVV hashing failed");
    CardError::UpstreamUnavailable {
        service: SECRET_HASHER,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_and_not_found_share_message() {
        assert_eq!(CardValidation::Invalid.message(), INVALID_MESSAGE);
        assert_eq!(
            CardValidation::NotFound.message(),
            CardValidation::Invalid.message()
        );
        assert_eq!(CardValidation::Valid.message(), VALID_MESSAGE);
        assert!(!CardValidation::NotFound.is_valid());
    }

    #[test]
    fn test_card_number_key_is_masked() {
        let key = CardKey::Number("5135123456789012".to_string());
        assert_eq!(key.to_string(), "number ending 9012");
        assert_eq!(
            CardKey::Code("ABC123XYZ9".to_string()).to_string(),
            "code ABC123XYZ9"
        );
    }
}
