//! pulsehub application entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pulsehub::config::Config;
use pulsehub::metrics;
use pulsehub::presentation::{request_router, streaming_router};
use pulsehub::state::AppState;
use pulsehub_store::Store;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pulsehub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "configuration error, refusing to start");
            std::process::exit(1);
        }
    };

    let prometheus_handle = match metrics::init_prometheus_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "failed to install prometheus recorder, refusing to start");
            std::process::exit(1);
        }
    };

    let store = match Store::connect(&config.mongodb_uri).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error_id = %e.error_id(), error = %e, "failed to connect to mongodb, refusing to start");
            std::process::exit(1);
        }
    };
    // `Store::connect` only parses the URI and starts background topology
    // monitoring; the driver never blocks on an actual server round trip
    // until the first command. An explicit ping here is what actually
    // turns an unreachable backend into the startup-fatal failure §6 calls
    // for, rather than deferring discovery to the first request.
    if !store.ping().await {
        tracing::error!("mongodb did not respond to startup ping, refusing to start");
        std::process::exit(1);
    }
    if let Err(e) = store.init(config.raw_events_ttl_days).await {
        tracing::error!(error_id = %e.error_id(), error = %e, "failed to initialize persistence indexes, refusing to start");
        std::process::exit(1);
    }

    let state = AppState::new(Arc::clone(&config), store, prometheus_handle);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let janitor_handle = tokio::spawn(pulsehub::janitor::run(
        Arc::clone(&state.aggregator),
        Duration::from_secs(config.janitor_interval_secs),
        shutdown_rx,
    ));

    let request_addr = config.request_addr();
    let streaming_addr = config.streaming_addr();

    let request_listener = match tokio::net::TcpListener::bind(request_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %request_addr, "failed to bind request endpoint, refusing to start");
            std::process::exit(1);
        }
    };
    let streaming_listener = match tokio::net::TcpListener::bind(streaming_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %streaming_addr, "failed to bind streaming endpoint, refusing to start");
            std::process::exit(1);
        }
    };

    tracing::info!(%request_addr, %streaming_addr, "pulsehub listening");

    let request_app = request_router(state.clone()).into_make_service_with_connect_info::<SocketAddr>();
    let streaming_app = streaming_router(state).into_make_service_with_connect_info::<SocketAddr>();

    let request_server =
        axum::serve(request_listener, request_app).with_graceful_shutdown(shutdown_signal());
    let streaming_server =
        axum::serve(streaming_listener, streaming_app).with_graceful_shutdown(shutdown_signal());

    let (request_result, streaming_result) = tokio::join!(request_server, streaming_server);

    let _ = shutdown_tx.send(true);
    let _ = janitor_handle.await;

    if let Err(e) = request_result {
        tracing::error!(error = %e, "request endpoint server error");
    }
    if let Err(e) = streaming_result {
        tracing::error!(error = %e, "streaming endpoint server error");
    }
}

/// Resolves on `ctrl_c` or (on Unix) `SIGTERM`, so both bound listeners stop
/// accepting new connections and drain in-flight requests before exit.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[allow(clippy::expect_used)]
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl+c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[allow(clippy::expect_used)]
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
