// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared handler state and router assembly.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use herzkompass_core::provider::PaymentProvider;
use herzkompass_core::reconciler::Reconciler;
use herzkompass_core::store::OrderStore;

use crate::orchestrator::ReportOrchestrator;
use crate::routes;

/// Everything the route handlers need.
pub struct AppState {
    /// Order and lead persistence.
    pub store: Arc<dyn OrderStore>,
    /// Payment provider client, absent when no API key is configured.
    pub provider: Option<Arc<dyn PaymentProvider>>,
    /// Webhook event reconciler.
    pub reconciler: Reconciler,
    /// Report generation pipeline.
    pub orchestrator: ReportOrchestrator,
    /// Webhook signing secret.
    pub webhook_secret: Option<String>,
    /// Bearer token required on the generation endpoint.
    pub worker_token: Option<String>,
    /// Price id for full report checkouts.
    pub price_id: Option<String>,
    /// Checkout redirect on success.
    pub success_url: String,
    /// Checkout redirect on abort.
    pub cancel_url: String,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/checkout", post(routes::checkout::create_checkout))
        .route(
            "/api/lead-checkout",
            post(routes::checkout::create_lead_checkout),
        )
        .route("/api/stripe/webhook", post(routes::webhook::receive))
        .route("/api/worker/generate", post(routes::generate::generate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
