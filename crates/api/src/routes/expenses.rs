//! Expense endpoints: listing, creation, and deletion.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::NaiveDate;
use common::{CardId, ExpenseId};
use domain::{CardStore, Expense, ExpenseStore, Money};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::{AppState, LedgerStore, auth, policy};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateExpenseRequest {
    pub card_id: Uuid,
    pub amount_cents: i64,
    pub description: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct ExpenseResponse {
    pub id: String,
    pub card_id: String,
    /// Amount in pt-BR notation, e.g. `"20,00"`.
    pub amount: String,
    pub description: String,
    pub date: NaiveDate,
}

impl ExpenseResponse {
    pub fn new(expense: &Expense) -> Self {
        Self {
            id: expense.id.to_string(),
            card_id: expense.card_id.to_string(),
            amount: expense.amount.formatted(),
            description: expense.description.clone(),
            date: expense.date,
        }
    }
}

// -- Handlers --

/// GET /expenses — every expense. Admin only.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    if !policy::can_view_any(&actor) {
        return Err(ApiError::Forbidden);
    }

    let expenses = ExpenseStore::list(&state.store).await?;
    Ok(Json(expenses.iter().map(ExpenseResponse::new).collect()))
}

/// POST /expenses — record an expense, debiting the card. Admin only.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    if !policy::can_create(&actor) {
        return Err(ApiError::Forbidden);
    }

    let expense = state
        .expenses
        .store(
            CardId::from_uuid(req.card_id),
            Money::from_cents(req.amount_cents),
            &req.description,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ExpenseResponse::new(&expense))))
}

/// DELETE /expenses/{id} — hard delete a single expense.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;

    let expense_id = Uuid::parse_str(&id)
        .map(ExpenseId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("invalid expense id: {e}")))?;
    let expense = ExpenseStore::find(&state.store, expense_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("expense {expense_id} not found")))?;

    // Access flows through the owning card.
    let card = CardStore::find(&state.store, expense.card_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("card {} not found", expense.card_id)))?;
    if !policy::can_access_card(&actor, &card) {
        return Err(ApiError::Forbidden);
    }

    ExpenseStore::delete(&state.store, expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
