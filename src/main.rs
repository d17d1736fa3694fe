//! # Speech Relay Backend - Main Application Entry Point
//!
//! Real-time speech-to-text streaming relay: WebSocket transcription sessions
//! with server-side microphone capture, cloud streaming recognition, fail-soft
//! translation, and HTTP endpoints for on-demand translation, transcript
//! persistence and text-to-speech.
//!
//! ## Application Architecture:
//! - **config**: configuration loading (TOML file + environment variables)
//! - **state**: shared application state, metrics and the session registry
//! - **audio**: microphone capture and PCM framing
//! - **session**: the per-connection transcription pipeline
//! - **gateway**: cloud recognizer/translation/synthesis façades
//! - **storage**: transcript and audio artifact persistence
//! - **websocket**: the `/ws/transcribe` connection handler
//! - **handlers**: the `/api` request/response endpoints
//! - **health / middleware / error**: observability and error envelopes

mod audio;
mod config;
mod error;
mod gateway;
mod handlers;
mod health;
mod middleware;
mod session;
mod state;
mod storage;
mod websocket;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use gateway::{RemoteRecognizer, RemoteSynthesizer, RemoteTranslator};
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag set by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting speech-relay-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    // Wire the cloud collaborators once; handlers and sessions share them
    // through the application state.
    let recognizer = Arc::new(RemoteRecognizer::new(
        config.speech.recognizer_url.clone(),
        config.speech.api_key.clone(),
    ));
    let translator = Arc::new(RemoteTranslator::new(
        config.translation.service_url.clone(),
        config.translation.api_key.clone(),
    ));
    let synthesizer = Arc::new(RemoteSynthesizer::new(
        config.synthesis.service_url.clone(),
        config.synthesis.api_key.clone(),
    ));
    let store = storage::from_config(&config.storage)?;
    info!("Storage backend: {}", config.storage.backend);

    let app_state = AppState::new(config.clone(), recognizer, translator, synthesizer, store);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .service(
                web::scope("/api")
                    .route("/translate", web::post().to(handlers::translate))
                    .route("/save_transcript", web::post().to(handlers::save_transcript))
                    .route("/tts", web::post().to(handlers::text_to_speech))
                    .route("/tts_from_file", web::post().to(handlers::tts_from_file))
                    .route("/sessions/{id}/stop", web::post().to(handlers::stop_session)),
            )
            .route("/ws/transcribe", web::get().to(websocket::transcribe_ws))
            .route("/healthcheck", web::get().to(health::healthcheck))
            .route("/health", web::get().to(health::health_report))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize structured logging. `RUST_LOG` overrides the default filter.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "speech_relay_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Listen for SIGTERM/SIGINT and flip the global shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
