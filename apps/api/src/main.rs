use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use queue_cell::handlers::QueueState;
use queue_cell::services::clock::SystemClock;
use queue_cell::services::lifecycle::QueueLifecycleService;
use queue_cell::services::notifier::LogNotifier;
use queue_cell::services::redis_store::RedisQueueStore;
use queue_cell::services::store::{MemoryQueueStore, QueueStore};
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ClinicFlow Queue API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    // Pick the queue store: Redis when configured, in-memory otherwise
    let store: Arc<dyn QueueStore> = match config.redis_url.as_deref() {
        Some(url) => match RedisQueueStore::new(url).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("Failed to initialize Redis queue store: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("REDIS_URL not set, using in-memory queue store");
            Arc::new(MemoryQueueStore::new())
        }
    };

    let lifecycle = Arc::new(QueueLifecycleService::new(
        store,
        Arc::new(SystemClock),
        Arc::new(LogNotifier),
        &config,
    ));
    let state = Arc::new(QueueState {
        config: config.clone(),
        lifecycle,
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
