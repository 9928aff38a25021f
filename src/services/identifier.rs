//! Random card identifiers.
//!
//! Every generator takes its random source as an argument so callers decide
//! between the thread RNG and a seeded one. Nothing here checks uniqueness;
//! the store's unique constraints do that and the lifecycle service retries.

use rand::Rng;
use secrecy::Secret;

pub const CARD_CODE_LEN: usize = 10;
pub const CARD_NUMBER_LEN: usize = 16;
pub const CARD_NUMBER_PREFIX_LEN: usize = 4;

const CARD_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CARD_NUMBER_SUFFIX_SPACE: u64 = 1_000_000_000_000;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("card number prefix must be exactly 4 digits, got {0:?}")]
    InvalidPrefix(String),
}

/// Identifiers for a card about to be issued
pub struct FreshIdentifiers {
    pub code: String,
    pub card_number: String,
    pub cvv: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct IdentifierGenerator {
    prefix: String,
}

impl IdentifierGenerator {
    pub fn new(prefix: impl Into<String>) -> Result<Self, GeneratorError> {
        let prefix = prefix.into();
        if prefix.len() != CARD_NUMBER_PREFIX_LEN || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GeneratorError::InvalidPrefix(prefix));
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Issuer prefix followed by a zero-padded 12-digit random suffix
    pub fn card_number<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let suffix = rng.gen_range(0..CARD_NUMBER_SUFFIX_SPACE);
        format!("{}{:012}", self.prefix, suffix)
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> FreshIdentifiers {
        FreshIdentifiers {
            code: card_code(rng),
            card_number: self.card_number(rng),
            cvv: Secret::new(cvv(rng)),
        }
    }
}

/// Ten characters drawn uniformly from `[A-Z0-9]`
pub fn card_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CARD_CODE_LEN)
        .map(|_| CARD_CODE_ALPHABET[rng.gen_range(0..CARD_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Three-digit CVV in `100..=999`
pub fn cvv<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100..=999u16).to_string()
}
