// src/config.rs
use labor_core::{RatePreset, RateTable};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use crate::AppError;

pub const ENV_PREFIX: &str = "LABOR_";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// --- General App Configuration ---

/// Values read from `LABOR_*` environment variables (after `.env` is loaded).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub rate_preset: Option<String>,
    pub rate_table_path: Option<PathBuf>,
    pub shift_hours: Option<Decimal>,
    pub api_token_sha256: Option<String>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<AppConfig>()?)
    }

    /// TLS paths, when both halves are configured.
    pub fn tls_paths(&self) -> Result<Option<(String, String)>, AppError> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Ok(Some((cert.clone(), key.clone()))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(AppError::MissingEnvVar(format!("{}KEY_PATH", ENV_PREFIX))),
            (None, Some(_)) => Err(AppError::MissingEnvVar(format!("{}CERT_PATH", ENV_PREFIX))),
        }
    }

    pub fn required_token_digest(&self) -> Result<String, AppError> {
        let digest = self
            .api_token_sha256
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AppError::MissingEnvVar(format!("{}API_TOKEN_SHA256", ENV_PREFIX)))?;
        if digest.len() != 64 || hex::decode(digest).is_err() {
            return Err(AppError::InvalidEnvVar {
                name: format!("{}API_TOKEN_SHA256", ENV_PREFIX),
                message: "expected 64 hex characters (SHA-256 of the bearer token)".to_string(),
            });
        }
        Ok(digest.to_ascii_lowercase())
    }
}

// --- Rate Table Selection ---

/// Where the rate table comes from. Command-line values win over the
/// environment; an explicit file wins over a preset.
#[derive(Debug, Clone, Default)]
pub struct TableSource {
    pub path: Option<PathBuf>,
    pub preset: Option<RatePreset>,
    pub shift_hours: Option<Decimal>,
}

impl TableSource {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let preset = match config.rate_preset.as_deref() {
            Some(name) => Some(name.parse::<RatePreset>()?),
            None => None,
        };
        Ok(Self {
            path: config.rate_table_path.clone(),
            preset,
            shift_hours: config.shift_hours,
        })
    }

    pub fn overridden_by(self, cli: TableSource) -> Self {
        // A preset chosen on the command line also displaces a file from the environment.
        let path = match (&cli.path, &cli.preset) {
            (Some(p), _) => Some(p.clone()),
            (None, Some(_)) => None,
            (None, None) => self.path,
        };
        Self {
            path,
            preset: cli.preset.or(self.preset),
            shift_hours: cli.shift_hours.or(self.shift_hours),
        }
    }

    pub fn load(&self) -> Result<RateTable, AppError> {
        let table = match &self.path {
            Some(path) => {
                let table = RateTable::from_json_file(path)?;
                info!("Rate table loaded from {}", path.display());
                table
            }
            None => {
                let preset = self.preset.unwrap_or_default();
                info!("Using rate preset '{}'", preset);
                preset.table()
            }
        };
        match self.shift_hours {
            Some(hours) => {
                info!("Overriding productive hours per shift: {}", hours);
                Ok(table.with_shift_hours(hours)?)
            }
            None => Ok(table),
        }
    }
}
