// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP route handlers.

pub mod checkout;
pub mod generate;
pub mod webhook;

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /health`: database reachability.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.health_check().await?;
    Ok(Json(json!({ "status": "ok" })))
}
