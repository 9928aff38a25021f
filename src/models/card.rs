use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Years a card stays valid after issuance.
pub const VALIDITY_YEARS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardStatus {
    #[serde(rename = "ACT")]
    Active,
    #[serde(rename = "INA")]
    Inactive,
    #[serde(rename = "BLO")]
    Blocked,
    #[serde(rename = "SUS")]
    Suspended,
}

impl CardStatus {
    /// Three-character code used in storage and on the wire
    pub fn as_code(&self) -> &'static str {
        match self {
            CardStatus::Active => "ACT",
            CardStatus::Inactive => "INA",
            CardStatus::Blocked => "BLO",
            CardStatus::Suspended => "SUS",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown card status code: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for CardStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACT" => Ok(CardStatus::Active),
            "INA" => Ok(CardStatus::Inactive),
            "BLO" => Ok(CardStatus::Blocked),
            "SUS" => Ok(CardStatus::Suspended),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub code: String,
    pub bank_swift: String,
    pub client_doc_type: String,
    pub client_doc_number: String,
    pub client_name: String,
    pub client_country: String,
    pub client_email: String,
    pub client_bank_id: String,
    pub card_number: String,
    pub issued_at: DateTime<Utc>,
    pub expiry_date: NaiveDate,
    #[serde(skip_serializing, default)]
    pub cvv_hash: String,
    pub status: CardStatus,
}

impl Card {
    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active
    }
}

/// Cardholder data supplied when requesting a new card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CardholderData {
    #[validate(length(min = 8, max = 11, message = "must be 8 to 11 characters"))]
    pub bank_swift: String,
    #[validate(length(min = 2, max = 3, message = "must be 2 or 3 characters"))]
    pub client_doc_type: String,
    #[validate(length(min = 1, max = 15, message = "must be 1 to 15 characters"))]
    pub client_doc_number: String,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub client_name: String,
    #[validate(length(equal = 2, message = "must be exactly 2 characters"))]
    pub client_country: String,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    pub client_email: String,
    #[validate(length(min = 1, max = 40, message = "must be 1 to 40 characters"))]
    pub client_bank_id: String,
}

/// Expiry date for a card issued at `issued_at`.
///
/// Calendar-year arithmetic, not a fixed day count. A leap day issued four
/// years before a non-leap year (2096-02-29) clamps to 28 February.
pub fn expiry_for(issued_at: DateTime<Utc>) -> NaiveDate {
    let issue_day = issued_at.date_naive();
    issue_day
        .checked_add_months(Months::new(VALIDITY_YEARS * 12))
        .unwrap_or(NaiveDate::MAX)
}
