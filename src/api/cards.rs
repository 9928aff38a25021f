use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::validation;
use crate::error::Result;
use crate::models::{Card, CardPatch, CardholderData};
use crate::services::card_lifecycle::{CardKey, UpdateCardRequest, ValidateCardRequest};

/// Creation response: the stored card plus the one-time plaintext CVV
#[derive(Serialize)]
pub struct CreatedCardResponse {
    #[serde(flatten)]
    pub card: Card,
    pub cvv: String,
}

#[derive(Deserialize)]
pub struct ValidateCardBody {
    pub card_number: String,
    pub cvv: String,
    pub expiry_date: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub message: String,
}

async fn list_cards(State(state): State<AppState>) -> Result<Json<Vec<Card>>> {
    let cards = state.cards.list().await?;
    tracing::info!(count = cards.len(), "Listed cards");
    Ok(Json(cards))
}

async fn get_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Card>> {
    let card = state.cards.lookup_by_code(&code).await?;
    Ok(Json(card))
}

async fn get_by_number(
    State(state): State<AppState>,
    Path(card_number): Path<String>,
) -> Result<Json<Card>> {
    validation::validate_card_number(&card_number)?;
    let card = state.cards.lookup_by_card_number(&card_number).await?;
    Ok(Json(card))
}

async fn create_card(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CardholderData>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(holder) = payload?;
    validation::validate_cardholder(&holder)?;

    let issued = state.cards.create(holder).await?;
    tracing::info!(card_code = %issued.card.code, "Card issued");

    let response = CreatedCardResponse {
        card: issued.card,
        cvv: issued.cvv.expose_secret().clone(),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn apply_update(state: &AppState, key: CardKey, patch: CardPatch) -> Result<Json<Card>> {
    validation::validate_patch(&patch)?;
    let card = state.cards.update(UpdateCardRequest { key, patch }).await?;
    Ok(Json(card))
}

async fn update_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    payload: std::result::Result<Json<CardPatch>, JsonRejection>,
) -> Result<Json<Card>> {
    let Json(patch) = payload?;
    apply_update(&state, CardKey::Code(code), patch).await
}

async fn update_by_number(
    State(state): State<AppState>,
    Path(card_number): Path<String>,
    payload: std::result::Result<Json<CardPatch>, JsonRejection>,
) -> Result<Json<Card>> {
    let Json(patch) = payload?;
    validation::validate_card_number(&card_number)?;
    apply_update(&state, CardKey::Number(card_number), patch).await
}

async fn remove_card(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode> {
    state.cards.remove(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Unknown card numbers answer exactly like failed credentials
async fn validate_card(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ValidateCardBody>, JsonRejection>,
) -> Result<Json<ValidationResponse>> {
    let Json(body) = payload?;
    validation::validate_card_number(&body.card_number)?;
    validation::validate_cvv(&body.cvv)?;
    let expiry_date = validation::parse_expiry_date(&body.expiry_date)?;

    let outcome = state
        .cards
        .validate(ValidateCardRequest {
            card_number: body.card_number,
            cvv: Secret::new(body.cvv),
            expiry_date,
        })
        .await?;

    Ok(Json(ValidationResponse {
        valid: outcome.is_valid(),
        message: outcome.message().to_string(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/cards", get(list_cards).post(create_card))
        .route("/api/v1/cards/validate", post(validate_card))
        .route(
            "/api/v1/cards/number/:card_number",
            get(get_by_number).put(update_by_number),
        )
        .route(
            "/api/v1/cards/:code",
            get(get_by_code).put(update_by_code).delete(remove_card),
        )
}
