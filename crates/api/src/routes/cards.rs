//! Card endpoints: creation, lookup, deposit, status change, update,
//! and deletion.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::{CardId, UserId};
use domain::{Card, CardBrand, CardStatus, CardStore, ExpenseStore, Money, UserStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::expenses::ExpenseResponse;
use crate::{AppState, LedgerStore, auth, policy};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateCardRequest {
    pub number: String,
    pub brand: CardBrand,
    pub status: CardStatus,
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct DepositRequest {
    pub amount_cents: i64,
}

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status: CardStatus,
}

#[derive(Deserialize)]
pub struct UpdateCardRequest {
    pub number: Option<String>,
    pub status: Option<CardStatus>,
    pub brand: Option<CardBrand>,
}

// -- Response types --

#[derive(Serialize)]
pub struct CardResponse {
    pub id: String,
    pub user_id: String,
    pub number: String,
    /// Balance in pt-BR notation, e.g. `"1.234,56"`.
    pub balance: String,
    pub status: String,
    pub brand: String,
    pub expenses: Vec<ExpenseResponse>,
}

impl CardResponse {
    pub fn new(card: &Card, expenses: &[domain::Expense]) -> Self {
        Self {
            id: card.id.to_string(),
            user_id: card.user_id.to_string(),
            number: card.number.to_string(),
            balance: card.balance.formatted(),
            status: card.status.to_string(),
            brand: card.brand.to_string(),
            expenses: expenses.iter().map(ExpenseResponse::new).collect(),
        }
    }
}

// -- Helpers --

fn parse_card_id(raw: &str) -> Result<CardId, ApiError> {
    Uuid::parse_str(raw)
        .map(CardId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("invalid card id: {e}")))
}

async fn load_card<S: LedgerStore>(state: &AppState<S>, raw_id: &str) -> Result<Card, ApiError> {
    let id = parse_card_id(raw_id)?;
    CardStore::find(&state.store, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("card {id} not found")))
}

async fn card_response<S: LedgerStore>(
    state: &AppState<S>,
    card: &Card,
) -> Result<CardResponse, ApiError> {
    let expenses = state.store.list_for_card(card.id).await?;
    Ok(CardResponse::new(card, &expenses))
}

// -- Handlers --

/// GET /cards — every card with its expenses. Admin only.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CardResponse>>, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    if !policy::can_view_any(&actor) {
        return Err(ApiError::Forbidden);
    }

    let cards = CardStore::list(&state.store).await?;
    let mut responses = Vec::with_capacity(cards.len());
    for card in &cards {
        responses.push(card_response(&state, card).await?);
    }
    Ok(Json(responses))
}

/// POST /cards — create a card for a user. Admin only.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardResponse>), ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    if !policy::can_create(&actor) {
        return Err(ApiError::Forbidden);
    }

    let owner_id = UserId::from_uuid(req.user_id);
    if UserStore::find(&state.store, owner_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!("unknown user {owner_id}")));
    }

    let card = state
        .cards
        .store(&req.number, req.status, req.brand, owner_id)
        .await?;

    // A fresh card has no expenses to load.
    Ok((StatusCode::CREATED, Json(CardResponse::new(&card, &[]))))
}

/// GET /cards/{id} — a single card with its expenses.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CardResponse>, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    let card = load_card(&state, &id).await?;
    if !policy::can_access_card(&actor, &card) {
        return Err(ApiError::Forbidden);
    }

    Ok(Json(card_response(&state, &card).await?))
}

/// POST /cards/{id}/deposit — add funds to an active card.
#[tracing::instrument(skip(state, headers, req))]
pub async fn deposit<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<DepositRequest>,
) -> Result<Json<CardResponse>, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    let card = load_card(&state, &id).await?;
    if !policy::can_access_card(&actor, &card) {
        return Err(ApiError::Forbidden);
    }

    let card = state
        .cards
        .deposit(&card, Money::from_cents(req.amount_cents))
        .await?;
    Ok(Json(card_response(&state, &card).await?))
}

/// PATCH /cards/{id}/status — move the card to another status.
#[tracing::instrument(skip(state, headers, req))]
pub async fn change_status<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<CardResponse>, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    let card = load_card(&state, &id).await?;
    if !policy::can_access_card(&actor, &card) {
        return Err(ApiError::Forbidden);
    }

    let card = state.cards.change_status(&card, req.status).await?;
    Ok(Json(card_response(&state, &card).await?))
}

/// PATCH /cards/{id} — partial update of number, status, and brand.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateCardRequest>,
) -> Result<Json<CardResponse>, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    let card = load_card(&state, &id).await?;
    if !policy::can_access_card(&actor, &card) {
        return Err(ApiError::Forbidden);
    }

    let card = state
        .cards
        .update(&card, req.number.as_deref(), req.status, req.brand)
        .await?;
    Ok(Json(card_response(&state, &card).await?))
}

/// DELETE /cards/{id} — hard delete, cascading the card's expenses.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    let card = load_card(&state, &id).await?;
    if !policy::can_access_card(&actor, &card) {
        return Err(ApiError::Forbidden);
    }

    CardStore::delete(&state.store, card.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
