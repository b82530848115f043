// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Intake and checkout routes.
//!
//! Intake always succeeds once the record is stored: a provider outage must
//! not lose a customer's questionnaire, so checkout session creation failing
//! only means the response carries no payment URL.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use herzkompass_core::CoreError;
use herzkompass_core::order::{NewLead, NewOrder};
use herzkompass_core::provider::{CheckoutParams, CreatedCheckout, PriceSpec};

use crate::error::ApiError;
use crate::state::AppState;

/// Lead plan pricing in cents, discounted while the funnel timer runs.
const PLANS: [(&str, &str, i64, i64); 3] = [
    ("1month", "1-Monats-Plan", 1799, 4999),
    ("3month", "3-Monats-Plan", 2999, 7999),
    ("6month", "6-Monats-Plan", 4999, 11999),
];

/// Intake payload for a full order.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    email: String,
    name: Option<String>,
    #[serde(default)]
    answers: Value,
    answers_raw: Option<Value>,
    /// Already-hosted photo URLs, stored as-is.
    photo_urls: Option<Vec<String>>,
    /// Base64-encoded photo payloads, stored as data URLs.
    photos: Option<Vec<String>>,
}

/// Merge hosted URLs and base64 payloads into one stored URL list.
/// Payloads that do not decode are skipped, intake must not fail on them.
fn collect_photo_urls(
    urls: Option<Vec<String>>,
    photos: Option<Vec<String>>,
) -> Option<Vec<String>> {
    let mut out = urls.unwrap_or_default();
    for payload in photos.unwrap_or_default() {
        let payload = payload.trim();
        if payload.starts_with("data:") || payload.starts_with("http") {
            out.push(payload.to_string());
            continue;
        }
        match BASE64.decode(payload) {
            Ok(bytes) => {
                out.push(format!("data:{};base64,{}", sniff_image_mime(&bytes), payload));
            }
            Err(e) => {
                warn!(error = %e, "dropping undecodable photo payload");
            }
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(b"\xff\xd8\xff") {
        "image/jpeg"
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP") {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

/// `POST /api/checkout`: store a full order and open a checkout session.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = request.email.trim().to_string();
    if email.is_empty() {
        return Err(CoreError::ValidationError {
            field: "email".to_string(),
            message: "must not be empty".to_string(),
        }
        .into());
    }

    let answers = if request.answers.is_object() {
        request.answers
    } else {
        json!({})
    };

    let order = state
        .store
        .create_order(NewOrder {
            email: email.clone(),
            name: request.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            answers,
            answers_raw: request.answers_raw,
            photo_urls: collect_photo_urls(request.photo_urls, request.photos),
        })
        .await?;

    info!(order_id = %order.id, "order stored at intake");

    let mut url = None;
    if let (Some(provider), Some(price_id)) = (&state.provider, &state.price_id) {
        let params = CheckoutParams {
            reference_id: order.id.clone(),
            customer_email: Some(email.clone()),
            price: PriceSpec::Price(price_id.clone()),
            success_url: format!(
                "{}?orderId={}&session_id={{CHECKOUT_SESSION_ID}}",
                state.success_url, order.id
            ),
            cancel_url: state.cancel_url.clone(),
            metadata: vec![("order_id".to_string(), order.id.clone())],
        };
        match provider.create_checkout_session(params).await {
            Ok(session) => {
                state
                    .store
                    .attach_order_checkout(&order.id, &session.id, session.payment_intent.as_deref())
                    .await?;
                url = session.url;
            }
            Err(e) => {
                // The order is already stored; the client can retry payment.
                warn!(order_id = %order.id, error = %e, "checkout session creation failed");
            }
        }
    }

    Ok(Json(json!({
        "ok": true,
        "orderId": order.id,
        "url": url,
        "dueAt": order.due_at,
    })))
}

/// Funnel checkout payload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadCheckoutRequest {
    plan: Option<String>,
    #[serde(default)]
    timer_expired: bool,
    lead_id: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

/// `POST /api/lead-checkout`: store (or reuse) a funnel lead and open a
/// checkout session priced from the plan table.
pub async fn create_lead_checkout(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LeadCheckoutRequest>,
) -> Result<Json<Value>, ApiError> {
    let plan_key = request.plan.as_deref().unwrap_or("1month");
    let (plan, plan_name, discount, normal) = PLANS
        .iter()
        .find(|(key, ..)| *key == plan_key)
        .copied()
        .unwrap_or(PLANS[0]);
    let amount = if request.timer_expired { normal } else { discount };

    let lead_id = match request.lead_id {
        Some(id) if state.store.get_lead(&id).await?.is_some() => id,
        _ => {
            let lead = state
                .store
                .create_lead(NewLead {
                    contact_email: request.email.clone(),
                    contact_name: request.name.clone(),
                    plan: Some(plan.to_string()),
                })
                .await?;
            lead.id
        }
    };

    let Some(provider) = &state.provider else {
        return Err(ApiError::internal("payment provider is not configured"));
    };

    let params = CheckoutParams {
        reference_id: lead_id.clone(),
        customer_email: request.email,
        price: PriceSpec::Amount {
            currency: "eur".to_string(),
            unit_amount: amount,
            product_name: format!("Herzkompass {plan_name}"),
        },
        success_url: format!(
            "{}?leadId={}&session_id={{CHECKOUT_SESSION_ID}}",
            state.success_url, lead_id
        ),
        cancel_url: state.cancel_url.clone(),
        metadata: vec![
            ("lead_id".to_string(), lead_id.clone()),
            ("plan".to_string(), plan.to_string()),
        ],
    };

    let session: CreatedCheckout = provider
        .create_checkout_session(params)
        .await
        .map_err(|e| CoreError::ProviderError {
            operation: "create_checkout_session".to_string(),
            details: e.to_string(),
        })?;

    state
        .store
        .attach_lead_checkout(
            &lead_id,
            Some(plan),
            &session.id,
            session.payment_intent.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "ok": true,
        "leadId": lead_id,
        "url": session.url,
        "amount": amount,
        "planName": plan_name,
    })))
}
