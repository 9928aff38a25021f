use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::services::card_lifecycle::CardError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("Card error: {0}")]
    Card(#[from] CardError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidBody(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            AppError::Card(err) => card_error_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, status = %status, "Request failed");
        }

        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

fn card_error_response(err: &CardError) -> (StatusCode, String) {
    match err {
        CardError::NotFound(_) => (StatusCode::NOT_FOUND, "Card not found".to_string()),
        CardError::BankNotRegistered { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        CardError::UpstreamUnavailable { service, .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{} unavailable, please try again later", service),
        ),
        CardError::UpstreamTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
        CardError::IdentifierExhausted { .. } | CardError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                format!("{} {}", field, reasons.join(", "))
            })
            .collect();
        fields.sort();

        AppError::Validation(fields.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::card_lifecycle::CardKey;
    use crate::store::StoreError;

    #[test]
    fn test_card_errors_map_to_statuses() {
        let cases = [
            (
                CardError::NotFound(CardKey::Code("ABC123XYZ9".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                CardError::BankNotRegistered {
                    swift: "NOPE0000".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CardError::UpstreamUnavailable {
                    service: "bank registry",
                    reason: "HTTP 500".into(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CardError::UpstreamTimeout {
                    service: "bank registry",
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                CardError::Store(StoreError::Corrupt("bad status".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let (_, message) = card_error_response(&CardError::Store(StoreError::Corrupt(
            "card XYZ: unknown card status code: ???".into(),
        )));
        assert_eq!(message, "Internal server error");
    }
}
