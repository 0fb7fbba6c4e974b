//! Actor resolution.
//!
//! Token issuance is out of scope; the session is represented by the
//! `x-user-id` header, resolved against the user store. Everything past
//! this point works with a full `User`.

use axum::http::HeaderMap;
use common::UserId;
use domain::{User, UserStore};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the acting user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolves the acting user or rejects the request with 401.
pub async fn require_actor<S: UserStore>(
    store: &S,
    headers: &HeaderMap,
) -> Result<User, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;

    let id = Uuid::parse_str(raw)
        .map_err(|_| ApiError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;

    store
        .find(UserId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("unknown user".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use domain::{InMemoryStore, NewUser, UserType};

    async fn store_with_user() -> (InMemoryStore, User) {
        let store = InMemoryStore::new();
        let user = UserStore::create(
            &store,
            NewUser {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                password_hash: "hash".to_string(),
                user_type: UserType::Comum,
            },
        )
        .await
        .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn resolves_known_user() {
        let (store, user) = store_with_user().await;
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&user.id.to_string()).unwrap(),
        );

        let actor = require_actor(&store, &headers).await.unwrap();
        assert_eq!(actor.id, user.id);
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let (store, _) = store_with_user().await;
        let err = require_actor(&store, &HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rejects_malformed_and_unknown_ids() {
        let (store, _) = store_with_user().await;

        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            require_actor(&store, &headers).await.unwrap_err(),
            ApiError::Unauthorized(_)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&UserId::new().to_string()).unwrap(),
        );
        assert!(matches!(
            require_actor(&store, &headers).await.unwrap_err(),
            ApiError::Unauthorized(_)
        ));
    }
}
