mod active_track;
mod api;
mod config;
mod error;
mod graphql;
mod mutations;
mod state;
mod tracks_query;
mod utils;

use std::sync::Arc;

use active_track::{ActiveTrackBroadcaster, CHANNEL_CAPACITY};
use api::api_router;
use axum::Router;
use config::{config_path_from_env, load_or_create_config, resolve_path};
use graphql::build_schema;
use library::Catalog;
use state::AppState;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.as_str().into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let data_dir = resolve_path(&config_path, &config.data_dir);
    let catalog = Catalog::open(&data_dir)?;
    info!("Serving catalog from {:?}", catalog.root());

    let broadcaster = ActiveTrackBroadcaster::new(CHANNEL_CAPACITY);
    let schema = build_schema(catalog.clone(), broadcaster.clone());
    let state = AppState {
        config: Arc::new(config.clone()),
        schema,
    };

    let shutdown = CancellationToken::new();
    let rotation = broadcaster.spawn(catalog, config.active_track.clone(), shutdown.clone());

    let app = Router::new()
        .merge(api_router(state))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http());

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {} ({})", bind_addr, config.environment);
    if config.environment.is_development() {
        info!("GraphiQL available at http://{}{}", bind_addr, api::GRAPHQL_PATH);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    if let Err(err) = rotation.await {
        warn!("Active track rotation ended abnormally: {}", err);
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}
