//! `helios-server` process entry point: load configuration, open the store,
//! load the model manager, and serve the REST API until a shutdown signal.

use std::{net::SocketAddr, sync::Arc};

use helios_server::{
    auth::AuthLayer,
    config::InferenceConfig,
    layers::{cors::CorsConfig, metrics::RequestMetricsLayer},
    models::ModelManager,
    routes,
    signal::SignalStream,
    state::AppState,
    store::{memory::MemoryStore, sqlite::SqliteStore, Store},
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let explicit_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = match InferenceConfig::load(explicit_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    config.logging.init();

    let store: Arc<dyn Store> = match SqliteStore::open(&config.server.db_path, config.server.max_points) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, path = %config.server.db_path.display(), "unable to open sqlite store, falling back to in-memory");
            Arc::new(MemoryStore::new(config.server.max_points))
        }
    };

    let mut models = ModelManager::new(&config.model);
    models.load();
    let models = Arc::new(models);
    info!(loaded = models.model_count(), "models loaded");

    let state = AppState::new(store, models, config.clone());
    let metrics_layer = RequestMetricsLayer::new(state.metrics.clone());

    let cors_layer = CorsConfig::default()
        .make_layer()
        .expect("default CORS configuration is always valid");

    let app = routes::router(state)
        .layer(AuthLayer::new(config.auth.clone()))
        .layer(cors_layer)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .route_layer(metrics_layer);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("host/port should form a valid socket address");

    info!(%addr, "starting helios-server");

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        match SignalStream::new() {
            Ok(mut signals) => {
                if let Err(e) = signals.next().await {
                    warn!(error = %e, "signal stream failed, shutting down anyway");
                }
            }
            Err(e) => warn!(error = %e, "unable to install signal handlers, shutting down immediately"),
        }
        info!("stopping helios-server");
        shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
    });

    if let Err(e) = axum_server::bind(addr).handle(handle).serve(app.into_make_service()).await {
        error!(error = %e, "server exited with an error");
        std::process::exit(1);
    }
}
