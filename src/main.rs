//! SoulFood - a small self-hosted gospel music library server.
//!
//! SoulFood keeps a SQLite catalog of songs and favorites in step with a
//! folder of audio files per singer, and serves a JSON API for a mobile
//! player page.

mod api;
mod config;
mod error;
mod library;
mod models;
mod session;
mod view;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::library::{reconcile, JsonSingerRegistry, LibraryStore, SharedSingerRegistry};
use crate::models::AppState;
use crate::session::{SessionStore, SESSION_HEADER};

/// Initialize the tracing/logging subsystem.
fn init_tracing(config: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            subscriber
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Configure CORS based on application config.
fn configure_cors(config: &config::Config) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .allowed_header(SESSION_HEADER)
        .max_age(3600);

    if config.cors_origins.len() == 1 && config.cors_origins[0] == "*" {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// Graceful shutdown handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    tracing::error!(error = %e, "{}", context);
    std::io::Error::other(format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize configuration
    let config = config::init();

    // Initialize logging
    init_tracing(config);

    // Validate configuration
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }

    let library = Arc::new(
        LibraryStore::open(&config.database_path)
            .map_err(|e| startup_error("Failed to open song catalog", e))?,
    );

    let singers: SharedSingerRegistry = Arc::new(
        JsonSingerRegistry::new(&config.singers_file, &config.audio_root)
            .map_err(|e| startup_error("Failed to load singer registry", e))?,
    );

    // Catch up with files added while the server was down
    let known = singers
        .list()
        .map_err(|e| startup_error("Failed to list singers", e))?;
    match reconcile(&library, &known) {
        Ok(report) => tracing::info!(
            added = report.added,
            failed = report.failed.len(),
            singers = known.len(),
            "Initial sync complete"
        ),
        Err(e) => tracing::warn!(error = %e, "Initial sync failed"),
    }

    let app_state = AppState {
        library,
        singers,
        sessions: Arc::new(SessionStore::with_limits(
            Duration::from_secs(config.session_idle_secs),
            config.max_sessions,
        )),
        audio_root: config.audio_root.clone(),
        images_root: config.images_root.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };

    let bind_address = config.bind_address();

    tracing::info!(
        address = %bind_address,
        database = %config.database_path.display(),
        audio_root = %config.audio_root.display(),
        "Starting SoulFood server"
    );

    // Create and start server
    let server = HttpServer::new(move || {
        App::new()
            // Middleware (order matters - outermost first)
            .wrap(TracingLogger::default())
            .wrap(configure_cors(config))
            // Shared state
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::PayloadConfig::new(config.max_upload_bytes))
            .configure(api::configure)
    })
    .bind(&bind_address)?
    .shutdown_timeout(30)
    .run();

    // Run server with graceful shutdown
    tokio::select! {
        result = server => {
            result
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
    }
}
