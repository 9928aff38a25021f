//! Request-shape checks applied before anything reaches the lifecycle service.

use chrono::NaiveDate;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{CardPatch, CardholderData};
use crate::services::identifier::CARD_NUMBER_LEN;

/// Canonical wire format for expiry dates
pub const EXPIRY_DATE_FORMAT: &str = "%Y-%m-%d";

/// The settable contact fields of a patch, shaped for `validator`
#[derive(Validate)]
struct ContactUpdate {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    client_name: Option<String>,
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    client_email: Option<String>,
}

pub fn validate_cardholder(data: &CardholderData) -> Result<()> {
    data.validate()?;
    Ok(())
}

pub fn validate_patch(patch: &CardPatch) -> Result<()> {
    ContactUpdate {
        client_name: patch.client_name.as_set().cloned(),
        client_email: patch.client_email.as_set().cloned(),
    }
    .validate()?;
    Ok(())
}

pub fn validate_card_number(card_number: &str) -> Result<()> {
    if card_number.len() != CARD_NUMBER_LEN || !card_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Validation(format!(
            "card_number must be exactly {} digits",
            CARD_NUMBER_LEN
        )));
    }
    Ok(())
}

pub fn validate_cvv(cvv: &str) -> Result<()> {
    if !(3..=4).contains(&cvv.len()) || !cvv.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Validation(
            "cvv must be 3 or 4 digits".to_string(),
        ));
    }
    Ok(())
}

/// Parses an expiry date in the canonical `YYYY-MM-DD` form.
/// Compact month/year forms such as `02/28` are rejected.
pub fn parse_expiry_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, EXPIRY_DATE_FORMAT).map_err(|_| {
        AppError::Validation("expiry_date must be a calendar date in YYYY-MM-DD format".to_string())
    })
}
