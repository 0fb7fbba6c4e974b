//! User endpoints.
//!
//! Creation here is the minimal bootstrap the ledger needs; the full
//! registration flow (passwords, verification, tokens) lives in another
//! system and fills in the credential hash.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::UserId;
use domain::{NewUser, User, UserStore, UserType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::{AppState, LedgerStore, auth, policy};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub user_type: UserType,
}

// -- Response types --

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub user_type: String,
}

impl UserResponse {
    fn new(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.user_type.to_string(),
        }
    }
}

// -- Helpers --

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    Uuid::parse_str(raw)
        .map(UserId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("invalid user id: {e}")))
}

// -- Handlers --

/// POST /users — create a user account.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = UserStore::create(
        &state.store,
        NewUser {
            name: req.name,
            email: req.email,
            password_hash: String::new(),
            user_type: req.user_type,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::new(&user))))
}

/// GET /users/{id} — a single user. Admin or the user themselves.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    let target = parse_user_id(&id)?;
    if !policy::can_access_user(&actor, target) {
        return Err(ApiError::Forbidden);
    }

    let user = UserStore::find(&state.store, target)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {target} not found")))?;
    Ok(Json(UserResponse::new(&user)))
}

/// DELETE /users/{id} — remove a user. Refused while the user owns cards.
#[tracing::instrument(skip(state, headers))]
pub async fn remove<S: LedgerStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let actor = auth::require_actor(&state.store, &headers).await?;
    let target = parse_user_id(&id)?;
    if !policy::can_access_user(&actor, target) {
        return Err(ApiError::Forbidden);
    }

    UserStore::delete(&state.store, target).await?;
    Ok(StatusCode::NO_CONTENT)
}
