// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Report generation trigger.
//!
//! Called by the delivery worker (cron) with a bearer token. Rerunning the
//! endpoint on an already generated order is allowed and overwrites the
//! stored file with identical bytes.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

/// Generation trigger payload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    order_id: Option<String>,
}

/// `POST /api/worker/generate`
pub async fn generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;

    let order_id = request
        .order_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("orderId is required"))?;

    let report = state.orchestrator.generate(&order_id).await?;

    Ok(Json(json!({
        "ok": true,
        "orderId": report.order_id,
        "file": report.file,
        "mailed": report.mailed,
    })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &state.worker_token else {
        return Err(ApiError::unauthorized("worker token not configured"));
    };
    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(ApiError::unauthorized("invalid worker token")),
    }
}
