//! HTTP API server for the card ledger.
//!
//! Thin plumbing around the domain crate: actor resolution, access policy
//! checks, request/response DTOs, and error-to-status mapping, with
//! structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod policy;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use domain::{
    CardService, CardStore, ChannelSink, ExpenseCreated, ExpenseService, ExpenseStore, UserStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Everything a store has to provide to back the API.
pub trait LedgerStore:
    CardStore + ExpenseStore + UserStore + Clone + Send + Sync + 'static
{
}

impl<T> LedgerStore for T where
    T: CardStore + ExpenseStore + UserStore + Clone + Send + Sync + 'static
{
}

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub cards: CardService<S>,
    pub expenses: ExpenseService<S, ChannelSink>,
    pub store: S,
}

/// Wires the services over `store` and returns the state together with
/// the receiving end of the expense event channel, for the notification
/// dispatcher to drain.
pub fn create_state<S: LedgerStore>(
    store: S,
) -> (Arc<AppState<S>>, mpsc::UnboundedReceiver<ExpenseCreated>) {
    let (sink, rx) = ChannelSink::new();
    let state = Arc::new(AppState {
        cards: CardService::new(store.clone()),
        expenses: ExpenseService::new(store.clone(), sink),
        store,
    });
    (state, rx)
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: LedgerStore>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/users", post(routes::users::create::<S>))
        .route("/users/{id}", get(routes::users::get::<S>))
        .route("/users/{id}", delete(routes::users::remove::<S>))
        .route("/cards", get(routes::cards::list::<S>))
        .route("/cards", post(routes::cards::create::<S>))
        .route("/cards/{id}", get(routes::cards::get::<S>))
        .route("/cards/{id}", patch(routes::cards::update::<S>))
        .route("/cards/{id}", delete(routes::cards::remove::<S>))
        .route("/cards/{id}/deposit", post(routes::cards::deposit::<S>))
        .route("/cards/{id}/status", patch(routes::cards::change_status::<S>))
        .route("/expenses", get(routes::expenses::list::<S>))
        .route("/expenses", post(routes::expenses::create::<S>))
        .route("/expenses/{id}", delete(routes::expenses::remove::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
