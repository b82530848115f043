// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Payment webhook endpoint.
//!
//! The raw body must survive untouched until the signature is checked, so
//! this handler takes `Bytes` instead of a JSON extractor. Once a verified
//! event reaches the reconciler, the endpoint always acknowledges with 200:
//! the provider retries on non-2xx, and a redelivery cannot fix a database
//! problem the reconciler already hit, it would only duplicate work the
//! idempotent updates then discard. Failures are logged loudly instead.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use herzkompass_core::webhook::{PaymentEvent, verify_signature};

use crate::error::ApiError;
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// `POST /api/stripe/webhook`
pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Some(secret) = &state.webhook_secret else {
        error!("webhook received but no signing secret is configured");
        return Err(ApiError::bad_request("webhook not configured"));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("missing signature"))?;

    match verify_signature(secret, &body, signature, SIGNATURE_TOLERANCE_SECS, Utc::now()) {
        Ok(true) => {}
        Ok(false) => {
            warn!("webhook signature did not verify");
            return Err(ApiError::bad_request("invalid signature"));
        }
        Err(e) => {
            warn!(error = %e, "malformed webhook signature header");
            return Err(ApiError::bad_request("invalid signature"));
        }
    }

    let event = PaymentEvent::parse(&body)
        .map_err(|e| ApiError::bad_request(format!("malformed event: {e}")))?;

    info!(event_type = event.type_name(), "webhook event verified");

    if let Err(e) = state.reconciler.process(event).await {
        error!(error = %e, "event reconciliation failed, acknowledging anyway");
    }

    Ok(Json(json!({ "received": true })))
}
