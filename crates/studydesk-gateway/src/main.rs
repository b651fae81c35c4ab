//! StudyDesk Gateway: pages plus the JSON API for materials and the study assistant.
//! Run: cargo run -p studydesk-gateway, then open http://127.0.0.1:5000

mod routes;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use studydesk_core::{api_key_from_env, Assistant, Catalog, Store, StudyConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[studydesk-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match StudyConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("[GATEWAY] Config not loaded: {}. Using defaults.", e);
            StudyConfig::default()
        }
    };

    let store = Store::new(&config.data_file);
    store.init();
    let catalog = Catalog::open(store, config.id_assignment);

    let api_key = api_key_from_env();
    if api_key.is_none() {
        tracing::warn!(
            "[GATEWAY] {} not set; the assistant answers in demo mode.",
            studydesk_core::config::API_KEY_ENV
        );
    }
    let assistant = Assistant::new(config.assistant.clone(), api_key);

    let state = routes::AppState {
        catalog: Arc::new(catalog),
        assistant: Arc::new(assistant),
    };
    let app = routes::router(state).layer(axum::middleware::from_fn(log_requests));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    tracing::info!(
        "[GATEWAY] StudyDesk {} listening on http://{}",
        studydesk_core::version(),
        addr
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn log_requests(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    tracing::info!(
        "[GATEWAY] {} {} from {}",
        request.method(),
        request.uri().path(),
        addr
    );
    next.run(request).await
}
