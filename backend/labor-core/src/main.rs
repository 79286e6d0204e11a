// src/main.rs
use anyhow::{Context, Result};
use axum::http::StatusCode as AxumStatusCode;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use labor_core::{LaborError, RateTableLoadError};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cli;
mod config;


use api::AppState;
use cli::{Cli, Command};
use config::{AppConfig, TableSource};

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {name}: {message}")]
    InvalidEnvVar { name: String, message: String },
    #[error("Rate table error: {0}")]
    RateTable(#[from] RateTableLoadError),
    #[error(transparent)]
    Labor(#[from] LaborError),
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    #[error("Missing or invalid API token")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, kind, message) = match &self {
            AppError::Labor(e) => {
                warn!("Rejected request: {}", e);
                (AxumStatusCode::UNPROCESSABLE_ENTITY, e.kind(), e.to_string())
            }
            AppError::Unauthorized => {
                warn!("Rejected request: {}", self);
                (
                    AxumStatusCode::UNAUTHORIZED,
                    "Unauthorized",
                    "A valid bearer token is required.".to_string(),
                )
            }
            AppError::Config(_)
            | AppError::MissingEnvVar(_)
            | AppError::InvalidEnvVar { .. }
            | AppError::RateTable(_)
            | AppError::TlsConfig(_) => {
                error!("Error occurred: {:?}", self);
                (
                    AxumStatusCode::INTERNAL_SERVER_ERROR,
                    "ServerConfiguration",
                    "Server configuration error.".to_string(),
                )
            }
            AppError::Io(_) | AppError::Csv(_) => {
                error!("Error occurred: {:?}", self);
                (
                    AxumStatusCode::INTERNAL_SERVER_ERROR,
                    "Internal",
                    "Internal server error. Check logs.".to_string(),
                )
            }
        };
        (
            status_code,
            Json(serde_json::json!({ "error": kind, "message": message })),
        )
            .into_response()
    }
}

// --- Main Application Logic ---

fn init_tracing() {
    // Logs go to stderr so CLI output on stdout stays clean.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let app_config = AppConfig::from_env().context("Loading LABOR_* configuration failed")?;
    let env_source = TableSource::from_config(&app_config)?;

    match cli.command.unwrap_or_default() {
        Command::Serve(args) => {
            let table = env_source.overridden_by(args.table.into_source()).load()?;
            serve(app_config, table).await
        }
        command => cli::run_oneshot(command, env_source),
    }
}

async fn serve(app_config: AppConfig, table: labor_core::RateTable) -> Result<()> {
    let token_digest = app_config.required_token_digest()?;
    info!(
        "Serving {} functions at {} productive hours per shift",
        table.len(),
        table.get_shift_hours()
    );

    let state = AppState {
        table: Arc::new(table),
        api_token_sha256: Arc::new(token_digest),
    };
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", app_config.host, app_config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", app_config.host, app_config.port))?;

    match app_config.tls_paths()? {
        Some((cert_path, key_path)) => {
            let tls_config = load_tls_config(&cert_path, &key_path).await?;
            info!("TLS configuration loaded from {} and {}", cert_path, key_path);
            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        }
        None => {
            warn!("No certificate configured; serving plain HTTP");
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Binding {} failed", addr))?;
            info!("Starting server on http://{}", addr);
            axum::serve(listener, app).await.context("HTTP server failed")?;
        }
    }
    Ok(())
}

async fn load_tls_config(cert_path: &str, key_path: &str) -> Result<RustlsConfig, AppError> {
    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| AppError::TlsConfig(format!("Failed to load TLS cert/key: {}", e)))
}
