// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stripe REST client.
//!
//! Implements [`PaymentProvider`] against the Stripe HTTP API. Requests are
//! form-encoded as the API expects; responses deserialize straight into the
//! core webhook payload types, so enrichment lookups and webhook events share
//! one set of structs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use herzkompass_core::provider::{
    CheckoutParams, CreatedCheckout, PaymentProvider, PriceSpec, ProviderError,
};
use herzkompass_core::webhook::{Charge, PaymentIntent};

const API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Stripe API client.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    payment_intent: Option<String>,
}

#[derive(Deserialize)]
struct ChargeList {
    #[serde(default)]
    data: Vec<Charge>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    /// Client against the public Stripe API.
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, API_BASE.to_string())
    }

    /// Client against an alternate endpoint, used by tests.
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            secret_key,
            base_url,
        }
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| request_error(operation, e))?;
        decode(operation, response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        path_and_query: &str,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(format!("{}{path_and_query}", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| request_error(operation, e))?;
        decode(operation, response).await
    }
}

fn request_error(operation: &str, err: reqwest::Error) -> ProviderError {
    ProviderError::Request {
        operation: operation.to_string(),
        details: err.to_string(),
    }
}

/// Decode a response, turning non-2xx statuses into [`ProviderError::Api`]
/// with the message Stripe put in the error body.
async fn decode<T: serde::de::DeserializeOwned>(
    operation: &str,
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| request_error(operation, e))?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
        return Err(ProviderError::Api {
            operation: operation.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(&body).map_err(|e| ProviderError::Request {
        operation: operation.to_string(),
        details: format!("malformed response: {e}"),
    })
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> Result<CreatedCheckout, ProviderError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("client_reference_id".into(), params.reference_id.clone()),
            ("success_url".into(), params.success_url.clone()),
            ("cancel_url".into(), params.cancel_url.clone()),
            ("line_items[0][quantity]".into(), "1".into()),
        ];

        match &params.price {
            PriceSpec::Price(price_id) => {
                form.push(("line_items[0][price]".into(), price_id.clone()));
            }
            PriceSpec::Amount {
                currency,
                unit_amount,
                product_name,
            } => {
                form.push((
                    "line_items[0][price_data][currency]".into(),
                    currency.clone(),
                ));
                form.push((
                    "line_items[0][price_data][unit_amount]".into(),
                    unit_amount.to_string(),
                ));
                form.push((
                    "line_items[0][price_data][product_data][name]".into(),
                    product_name.clone(),
                ));
            }
        }

        if let Some(email) = &params.customer_email {
            form.push(("customer_email".into(), email.clone()));
        }

        // Metadata goes on the session and on its payment intent, so that
        // intent and charge events can be traced back without a session lookup.
        for (key, value) in &params.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
            form.push((
                format!("payment_intent_data[metadata][{key}]"),
                value.clone(),
            ));
        }

        let session: SessionResponse = self
            .post_form("create_checkout_session", "/checkout/sessions", &form)
            .await?;

        debug!(session_id = %session.id, "checkout session created");

        Ok(CreatedCheckout {
            id: session.id,
            url: session.url,
            payment_intent: session.payment_intent,
        })
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, ProviderError> {
        self.get(
            "retrieve_intent",
            &format!("/payment_intents/{intent_id}?expand[]=latest_charge"),
        )
        .await
    }

    async fn latest_charge_for_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Charge>, ProviderError> {
        let list: ChargeList = self
            .get(
                "latest_charge_for_intent",
                &format!("/charges?payment_intent={intent_id}&limit=1"),
            )
            .await?;
        Ok(list.data.into_iter().next())
    }
}
