use chat_relay::{build_router, AppConfig, AppState, Store};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting chat relay server");

    let config = AppConfig::from_env();

    let store = match config.database_url.as_deref() {
        Some(url) => match Store::postgres(url).await {
            Ok(store) => store,
            Err(e) => {
                error!(error = %e, "Failed to initialize database");
                return;
            }
        },
        None => {
            warn!("DATABASE_URL not set, using in-memory store");
            Store::in_memory()
        }
    };

    info!(presence_scope = %config.presence_scope, "Relay configured");

    let app_state = AppState::new(&config, store);
    let app = build_router(app_state, &config);

    let address = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %address, error = %e, "Failed to bind");
            return;
        }
    };

    info!("Server running on http://{}", address);
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
    }
}
