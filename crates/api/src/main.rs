//! API server entry point.

use api::LedgerStore;
use api::config::Config;
use domain::InMemoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use notifier::{Dispatcher, InMemoryMailer};
use store::PostgresStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S: LedgerStore>(store: S, config: Config, metrics_handle: PrometheusHandle) {
    let (state, events_rx) = api::create_state(store.clone());

    // Notification side channel: drains expense events independently of
    // the request path. The mail transport boundary is the Mailer trait.
    let dispatcher = Dispatcher::new(store, InMemoryMailer::new());
    tokio::spawn(dispatcher.run(events_rx));

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting card ledger API");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the store and run
    let config = Config::from_env();
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresStore::connect(&url)
                .await
                .expect("failed to connect to database");
            store.run_migrations().await.expect("migrations failed");
            serve(store, config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running on the in-memory store");
            serve(InMemoryStore::new(), config, metrics_handle).await;
        }
    }
}
