//! # CTF Registration Server
//!
//! Serves the team registration form and the email confirmation link.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p ctfreg-api
//! ```

use ctfreg_api::{
    app::{self, AppState},
    config::{Config, MailBackend, StoreConfig},
};
use ctfreg_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    mail::{ConsoleMailer, HttpMailer, Mailer},
    store::{MemoryStore, PgStore, RegistrationStore},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ctfreg_api=debug,ctfreg_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "CTF registration server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let store: Arc<dyn RegistrationStore> = match &config.store {
        StoreConfig::Postgres {
            url,
            max_connections,
        } => {
            let pool = create_pool(DatabaseConfig {
                url: url.clone(),
                max_connections: *max_connections,
                ..DatabaseConfig::default()
            })
            .await?;
            run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory store, registrations are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.mail.backend {
        MailBackend::Console => Arc::new(ConsoleMailer),
        MailBackend::Http { url, token } => Arc::new(HttpMailer::new(url.clone(), token.clone())),
    };

    let bind_address = config.bind_address();
    let state = AppState::new(store, mailer, config);
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, exiting...");
}
