// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Downstream automation notifications.
//!
//! When an order transitions to paid, the reconciler emits one notification
//! to the fulfillment automation (which schedules the delivery worker).
//! Delivery of the notification is best-effort: a lost notification delays
//! fulfillment but never rolls back the payment transition.

use async_trait::async_trait;
use thiserror::Error;

/// Notification sent when a record becomes paid.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AutomationEvent {
    /// The paid record's id.
    pub order_id: String,
    /// Event type that confirmed the payment, for tracing.
    pub source: String,
    /// Resolved contact email, if any.
    pub email: Option<String>,
    /// Resolved contact name, if any.
    pub name: Option<String>,
    /// Checkout session reference, if known.
    pub session_ref: Option<String>,
    /// Payment intent reference, if known.
    pub intent_ref: Option<String>,
}

/// Errors from the automation sink.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The notification could not be delivered.
    #[error("automation forward failed: {0}")]
    Delivery(String),
}

/// Sink for paid-order notifications.
#[async_trait]
pub trait AutomationForwarder: Send + Sync {
    /// Deliver one notification. Implementations should not retry forever;
    /// the caller treats failures as non-fatal.
    async fn forward(&self, event: &AutomationEvent) -> Result<(), ForwardError>;
}
