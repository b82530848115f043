// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Herzkompass API server binary.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};

use herzkompass_core::automation::AutomationForwarder;
use herzkompass_core::migrations;
use herzkompass_core::provider::PaymentProvider;
use herzkompass_core::reconciler::Reconciler;
use herzkompass_core::store::{OrderStore, PostgresOrderStore};

use herzkompass_server::automation::HttpAutomationForwarder;
use herzkompass_server::config::Config;
use herzkompass_server::mailer::{Mailer, ResendMailer};
use herzkompass_server::orchestrator::ReportOrchestrator;
use herzkompass_server::report_store::FsReportStore;
use herzkompass_server::state::{AppState, router};
use herzkompass_server::stripe::StripeClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("herzkompass_server=info".parse().unwrap())
                .add_directive("herzkompass_core=info".parse().unwrap()),
        )
        .init();

    info!("Starting Herzkompass API server");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_addr = %config.http_addr,
        report_dir = %config.report_dir.display(),
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    info!("Database connection established");

    info!("Running database migrations...");
    migrations::run_postgres(&pool).await?;
    info!("Migrations completed");

    let store: Arc<dyn OrderStore> = Arc::new(PostgresOrderStore::new(pool.clone()));

    let provider: Option<Arc<dyn PaymentProvider>> = match &config.stripe_secret_key {
        Some(key) => Some(Arc::new(StripeClient::new(key.clone()))),
        None => {
            warn!("STRIPE_SECRET_KEY not set, checkout and enrichment disabled");
            None
        }
    };

    let forwarder: Option<Arc<dyn AutomationForwarder>> = config
        .automation_webhook_url
        .clone()
        .map(|url| Arc::new(HttpAutomationForwarder::new(url)) as Arc<dyn AutomationForwarder>);

    let mailer: Option<Arc<dyn Mailer>> = match &config.resend_api_key {
        Some(key) => Some(Arc::new(ResendMailer::new(
            key.clone(),
            config.resend_from.clone(),
        ))),
        None => {
            warn!("RESEND_API_KEY not set, report mail disabled");
            None
        }
    };

    let template = match &config.template_path {
        Some(path) => match tokio::fs::read(path).await {
            Ok(bytes) => {
                info!(path = %path.display(), "report template loaded");
                Some(bytes)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "template unreadable, rendering blank pages");
                None
            }
        },
        None => None,
    };

    let reconciler = Reconciler::new(store.clone(), provider.clone(), forwarder);
    let orchestrator = ReportOrchestrator::new(
        store.clone(),
        Arc::new(FsReportStore::new(config.report_dir.clone())),
        mailer,
        template,
    );

    let state = Arc::new(AppState {
        store,
        provider,
        reconciler,
        orchestrator,
        webhook_secret: config.stripe_webhook_secret.clone(),
        worker_token: config.worker_token.clone(),
        price_id: config.stripe_price_id.clone(),
        success_url: config.stripe_success_url.clone(),
        cancel_url: config.stripe_cancel_url.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "Herzkompass API server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    pool.close().await;
    info!("Shutdown complete");

    Ok(())
}
