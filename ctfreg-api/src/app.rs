/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use ctfreg_api::{app::{self, AppState}, config::Config};
/// use ctfreg_shared::{mail::ConsoleMailer, store::MemoryStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(ConsoleMailer), config);
/// let app = app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use ctfreg_shared::{
    auth::token::TokenGenerator,
    mail::{ConfirmationMailer, Mailer},
    media::MediaStorage,
    store::RegistrationStore,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Room for the text fields and multipart framing on top of the image
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RegistrationStore>,
    pub media: MediaStorage,
    pub confirmation: ConfirmationMailer,
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn RegistrationStore>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        let registration = &config.registration;

        let confirmation = ConfirmationMailer::new(
            mailer,
            TokenGenerator::new(&registration.secret_key, registration.token_validity_days),
            registration.competition_name.clone(),
            config.mail.from_email.clone(),
        );
        let media = MediaStorage::new(registration.media_root.clone(), registration.max_image_bytes);

        Self {
            store,
            media,
            confirmation,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health          # Store connectivity
/// ├── GET  /confirm-email   # Activate an account from the mailed link
/// └── /v1/
///     ├── GET  /register    # Field descriptions of the registration forms
///     └── POST /register    # Register a user and its team
/// ```
pub fn build_router(state: AppState) -> Router {
    let v1_routes = Router::new().route(
        "/register",
        get(routes::registration::form_fields).post(routes::registration::register),
    );

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    let body_limit = state.media.max_image_bytes() + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/confirm-email", get(routes::registration::confirm_email))
        .nest("/v1", v1_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.enable_hsts))
        .with_state(state)
}
