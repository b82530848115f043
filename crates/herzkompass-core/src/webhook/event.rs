// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Typed payment webhook events.
//!
//! The provider wraps every event in an envelope:
//!
//! ```json
//! { "id": "evt_...", "type": "checkout.session.completed",
//!   "data": { "object": { ... } } }
//! ```
//!
//! Only the event families the reconciler acts on get typed payloads. Every
//! other type decodes to [`PaymentEvent::Unrecognized`] so the webhook
//! endpoint can acknowledge it without failing.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Event payload decoding errors.
#[derive(Debug, Error)]
pub enum EventParseError {
    /// Body was not valid JSON or did not match the envelope shape.
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A reference that the provider may deliver either as a bare id or as the
/// full object when the request asked for expansion.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    /// Bare object id.
    Id(String),
    /// Expanded object.
    Object(Box<T>),
}

impl<T> Expandable<T> {
    /// The referenced object's id, when the variant carries one directly.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            Self::Object(_) => None,
        }
    }

    /// The expanded object, if present.
    pub fn object(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Object(obj) => Some(obj),
        }
    }
}

/// Customer contact block on a checkout session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    /// Email entered during checkout.
    pub email: Option<String>,
    /// Name entered during checkout.
    pub name: Option<String>,
}

/// Checkout session object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    /// Session id (`cs_...`).
    pub id: String,
    /// Our record id, set when we created the session.
    pub client_reference_id: Option<String>,
    /// Free-form metadata set when we created the session.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Email the session was created with, if we passed one.
    pub customer_email: Option<String>,
    /// Contact data collected during checkout.
    pub customer_details: Option<CustomerDetails>,
    /// Payment intent backing the session, if one exists yet.
    pub payment_intent: Option<String>,
}

impl CheckoutSession {
    /// Best contact email carried directly on the session.
    pub fn email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref().and_then(|d| d.email.as_deref()))
    }

    /// Customer name carried on the session.
    pub fn name(&self) -> Option<&str> {
        self.customer_details.as_ref().and_then(|d| d.name.as_deref())
    }
}

/// Payment intent object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentIntent {
    /// Intent id (`pi_...`).
    pub id: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Receipt email, if the customer provided one.
    pub receipt_email: Option<String>,
    /// Most recent charge. Expanded only when we asked for it.
    pub latest_charge: Option<Expandable<Charge>>,
    /// Last error message on a failed intent.
    pub last_payment_error: Option<PaymentError>,
}

/// Error block on a failed payment intent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentError {
    /// Human-readable failure reason.
    pub message: Option<String>,
}

/// Billing contact block on a charge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingDetails {
    /// Billing email.
    pub email: Option<String>,
    /// Billing name.
    pub name: Option<String>,
}

/// PayPal payer name as the provider reports it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaypalName {
    /// Given name.
    pub given_name: Option<String>,
    /// Surname.
    pub surname: Option<String>,
}

/// PayPal-specific payment method details on a charge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaypalDetails {
    /// Payer email at PayPal.
    pub payer_email: Option<String>,
    /// Payer name at PayPal.
    pub payer_name: Option<PaypalName>,
}

/// Per-method details on a charge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentMethodDetails {
    /// Present when the charge went through PayPal.
    pub paypal: Option<PaypalDetails>,
}

/// Charge object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Charge {
    /// Charge id (`ch_...` or `py_...`).
    pub id: String,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Intent this charge belongs to.
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    /// Billing contact, when the payment method carried one.
    pub billing_details: Option<BillingDetails>,
    /// Per-method details, e.g. PayPal payer data.
    pub payment_method_details: Option<PaymentMethodDetails>,
}

impl Charge {
    /// Id of the intent this charge belongs to, expanded or not.
    pub fn intent_id(&self) -> Option<&str> {
        match self.payment_intent.as_ref()? {
            Expandable::Id(id) => Some(id),
            Expandable::Object(intent) => Some(&intent.id),
        }
    }

    /// Best contact email on the charge. Billing details win over the
    /// PayPal payer block.
    pub fn email(&self) -> Option<&str> {
        if let Some(email) = self
            .billing_details
            .as_ref()
            .and_then(|b| b.email.as_deref())
        {
            return Some(email);
        }
        self.paypal().and_then(|p| p.payer_email.as_deref())
    }

    /// Best contact name on the charge.
    pub fn name(&self) -> Option<String> {
        if let Some(name) = self.billing_details.as_ref().and_then(|b| b.name.clone()) {
            return Some(name);
        }
        let payer = self.paypal()?.payer_name.as_ref()?;
        match (payer.given_name.as_deref(), payer.surname.as_deref()) {
            (Some(given), Some(sur)) => Some(format!("{given} {sur}")),
            (Some(given), None) => Some(given.to_string()),
            (None, Some(sur)) => Some(sur.to_string()),
            (None, None) => None,
        }
    }

    fn paypal(&self) -> Option<&PaypalDetails> {
        self.payment_method_details.as_ref()?.paypal.as_ref()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: Value,
}

/// A decoded payment webhook event.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    /// `checkout.session.completed`
    SessionCompleted(CheckoutSession),
    /// `checkout.session.async_payment_succeeded`
    SessionAsyncPaymentSucceeded(CheckoutSession),
    /// `checkout.session.async_payment_failed`
    SessionAsyncPaymentFailed(CheckoutSession),
    /// `payment_intent.succeeded`
    IntentSucceeded(PaymentIntent),
    /// `payment_intent.payment_failed`
    IntentFailed(PaymentIntent),
    /// `charge.succeeded`
    ChargeSucceeded(Charge),
    /// Any event type the reconciler does not act on.
    Unrecognized {
        /// The envelope's `type` field.
        event_type: String,
    },
}

impl PaymentEvent {
    /// Decode a raw webhook body.
    ///
    /// Unknown event types succeed as [`PaymentEvent::Unrecognized`];
    /// only a malformed envelope or payload object is an error.
    pub fn parse(body: &[u8]) -> Result<Self, EventParseError> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        let object = envelope.data.object;

        let event = match envelope.event_type.as_str() {
            "checkout.session.completed" => {
                Self::SessionCompleted(serde_json::from_value(object)?)
            }
            "checkout.session.async_payment_succeeded" => {
                Self::SessionAsyncPaymentSucceeded(serde_json::from_value(object)?)
            }
            "checkout.session.async_payment_failed" => {
                Self::SessionAsyncPaymentFailed(serde_json::from_value(object)?)
            }
            "payment_intent.succeeded" => Self::IntentSucceeded(serde_json::from_value(object)?),
            "payment_intent.payment_failed" => {
                Self::IntentFailed(serde_json::from_value(object)?)
            }
            "charge.succeeded" => Self::ChargeSucceeded(serde_json::from_value(object)?),
            _ => Self::Unrecognized {
                event_type: envelope.event_type,
            },
        };

        Ok(event)
    }

    /// The envelope event type, for logging.
    pub fn type_name(&self) -> &str {
        match self {
            Self::SessionCompleted(_) => "checkout.session.completed",
            Self::SessionAsyncPaymentSucceeded(_) => "checkout.session.async_payment_succeeded",
            Self::SessionAsyncPaymentFailed(_) => "checkout.session.async_payment_failed",
            Self::IntentSucceeded(_) => "payment_intent.succeeded",
            Self::IntentFailed(_) => "payment_intent.payment_failed",
            Self::ChargeSucceeded(_) => "charge.succeeded",
            Self::Unrecognized { event_type } => event_type,
        }
    }
}
