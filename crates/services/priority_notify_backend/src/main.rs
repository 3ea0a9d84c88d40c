// File: services/priority_notify_backend/src/main.rs
use priority_notify_backend::{build_router, AppState, StartupError};
use priority_notify_common::logging;
use priority_notify_config::load_config;
use priority_notify_db::{init_schemas, DbClient};
use priority_notify_notifications::EventBroker;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = load_config()?;
    logging::init_with_level(logging::parse_level(&config.log_level));

    if config.uses_default_secret() {
        warn!("SECRET_KEY is the built-in default; sessions can be forged until it is changed");
    }
    if config.oidc.is_none() {
        warn!("No [oidc] section configured; browser login is disabled");
    }

    let db = DbClient::from_config(&config.database).await?;
    init_schemas(&db).await?;
    info!("Database ready");

    let config = Arc::new(config);
    let state = AppState::builder(config.clone()).with_db(db).build().await?;
    let app = build_router(&state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.broker.clone()))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM, then end every open event stream so the
/// server can drain.
async fn shutdown_signal(broker: Arc<EventBroker>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown requested, closing event streams");
    broker.close();
}
