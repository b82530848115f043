// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Herzkompass server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Bearer token the generation worker must present
    pub worker_token: Option<String>,
    /// Payment provider API key (checkout and intent lookups)
    pub stripe_secret_key: Option<String>,
    /// Webhook signing secret
    pub stripe_webhook_secret: Option<String>,
    /// Price id used for full report checkouts
    pub stripe_price_id: Option<String>,
    /// Redirect target after a successful checkout
    pub stripe_success_url: String,
    /// Redirect target after an abandoned checkout
    pub stripe_cancel_url: String,
    /// Resend API key for report delivery mail
    pub resend_api_key: Option<String>,
    /// Sender address for delivery mail
    pub resend_from: String,
    /// Automation endpoint notified on every new payment
    pub automation_webhook_url: Option<String>,
    /// Directory finished reports are written to
    pub report_dir: PathBuf,
    /// Optional PDF template the report is drawn onto
    pub template_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `HERZKOMPASS_DATABASE_URL`: PostgreSQL connection string
    ///
    /// Optional (with defaults):
    /// - `HERZKOMPASS_HTTP_PORT`: HTTP listen port (default: 8080)
    /// - `HERZKOMPASS_WORKER_TOKEN`: bearer token for the generation endpoint
    /// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`, `STRIPE_PRICE_ID`
    /// - `STRIPE_SUCCESS_URL`, `STRIPE_CANCEL_URL`
    /// - `RESEND_API_KEY`, `RESEND_FROM`
    /// - `AUTOMATION_WEBHOOK_URL`
    /// - `HERZKOMPASS_REPORT_DIR`: report output directory (default: .data/reports)
    /// - `HERZKOMPASS_TEMPLATE_PATH`: PDF template to render onto
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("HERZKOMPASS_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("HERZKOMPASS_DATABASE_URL"))?;

        let http_port: u16 = std::env::var("HERZKOMPASS_HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("HERZKOMPASS_HTTP_PORT", "must be a valid port number")
            })?;

        let report_dir = std::env::var("HERZKOMPASS_REPORT_DIR")
            .unwrap_or_else(|_| ".data/reports".to_string());

        Ok(Self {
            database_url,
            http_addr: SocketAddr::from(([0, 0, 0, 0], http_port)),
            worker_token: opt_var("HERZKOMPASS_WORKER_TOKEN"),
            stripe_secret_key: opt_var("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: opt_var("STRIPE_WEBHOOK_SECRET"),
            stripe_price_id: opt_var("STRIPE_PRICE_ID"),
            stripe_success_url: std::env::var("STRIPE_SUCCESS_URL")
                .unwrap_or_else(|_| "https://herzkompass.app/danke".to_string()),
            stripe_cancel_url: std::env::var("STRIPE_CANCEL_URL")
                .unwrap_or_else(|_| "https://herzkompass.app/checkout".to_string()),
            resend_api_key: opt_var("RESEND_API_KEY"),
            resend_from: std::env::var("RESEND_FROM")
                .unwrap_or_else(|_| "Herzkompass <report@herzkompass.app>".to_string()),
            automation_webhook_url: opt_var("AUTOMATION_WEBHOOK_URL"),
            report_dir: PathBuf::from(report_dir),
            template_path: opt_var("HERZKOMPASS_TEMPLATE_PATH").map(PathBuf::from),
        })
    }
}

/// Read a variable, treating empty values as unset.
fn opt_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
