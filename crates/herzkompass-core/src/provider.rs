// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Payment provider abstraction.
//!
//! The reconciler only needs three calls: create a checkout session at
//! intake, retrieve an intent to enrich sparse events, and list the latest
//! charge of an intent. The HTTP client lives in the server crate; tests use
//! an in-memory fake.

use async_trait::async_trait;
use thiserror::Error;

use crate::webhook::{Charge, PaymentIntent};

/// How the checkout line item is priced.
#[derive(Debug, Clone)]
pub enum PriceSpec {
    /// A preconfigured price id at the provider.
    Price(String),
    /// Ad-hoc price data.
    Amount {
        /// ISO currency code, lowercase (e.g. "eur").
        currency: String,
        /// Amount in the currency's smallest unit.
        unit_amount: i64,
        /// Product name shown at checkout.
        product_name: String,
    },
}

/// Parameters for creating a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    /// Our record id, stored as the session's client reference.
    pub reference_id: String,
    /// Prefill email, if known.
    pub customer_email: Option<String>,
    /// Line item pricing.
    pub price: PriceSpec,
    /// Where the provider redirects after payment.
    pub success_url: String,
    /// Where the provider redirects on abort.
    pub cancel_url: String,
    /// Metadata set on both the session and its payment intent.
    pub metadata: Vec<(String, String)>,
}

/// A freshly created checkout session.
#[derive(Debug, Clone)]
pub struct CreatedCheckout {
    /// Session id.
    pub id: String,
    /// Hosted checkout URL to redirect the customer to.
    pub url: Option<String>,
    /// Payment intent, if the provider allocated one already.
    pub payment_intent: Option<String>,
}

/// Errors from the payment provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("provider request failed during '{operation}': {details}")]
    Request {
        /// The provider operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status} during '{operation}': {message}")]
    Api {
        /// The provider operation that failed.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },
}

/// Client interface to the payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        params: CheckoutParams,
    ) -> Result<CreatedCheckout, ProviderError>;

    /// Retrieve a payment intent with its latest charge expanded.
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, ProviderError>;

    /// Fetch the most recent charge of an intent, if any exists.
    async fn latest_charge_for_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Charge>, ProviderError>;
}
