// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Order and lead domain types.
//!
//! An order moves through a small state machine driven by payment webhooks
//! and the delivery worker:
//!
//! ```text
//!   queued ──> pending ──> paid ──> generated
//!      │          │
//!      └──────────┴──────> failed ──> paid   (late async payment)
//! ```
//!
//! `paid` is sticky: once a record is paid, no later event may demote it.
//! `failed` is not terminal because asynchronous payment methods can fail
//! first and succeed on a retry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How long after intake (and again after payment) delivery is promised.
pub const DUE_AFTER_HOURS: i64 = 10;

/// Compute the delivery deadline relative to `from`.
pub fn due_at_from(from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::hours(DUE_AFTER_HOURS)
}

/// Lifecycle status of an order or lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at intake, no payment session yet.
    Queued,
    /// A payment session exists, payment not yet confirmed.
    Pending,
    /// Payment confirmed.
    Paid,
    /// A payment attempt failed. Not terminal.
    Failed,
    /// The report was rendered and stored.
    Generated,
}

impl OrderStatus {
    /// Database representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Generated => "generated",
        }
    }

    /// Parse a database status string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "generated" => Some(Self::Generated),
            _ => None,
        }
    }

    /// Whether a record in this status has a confirmed payment.
    /// Paid records must never be demoted by later failure events.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::Generated)
    }
}

/// Order record from the persistence layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRecord {
    /// Unique identifier for the order.
    pub id: String,
    /// Customer email, required at intake.
    pub email: String,
    /// Customer display name, if known.
    pub name: Option<String>,
    /// Current status (queued, pending, paid, failed, generated).
    pub status: String,
    /// Normalized questionnaire answers keyed by question id.
    pub answers: sqlx::types::Json<Value>,
    /// Raw questionnaire submission as received, for audit.
    pub answers_raw: Option<sqlx::types::Json<Value>>,
    /// Uploaded photo URLs, if any.
    pub photo_urls: Option<sqlx::types::Json<Vec<String>>>,
    /// Delivery deadline. Set at intake, refreshed on payment.
    pub due_at: DateTime<Utc>,
    /// When payment was confirmed.
    pub paid_at: Option<DateTime<Utc>>,
    /// When the report was emailed.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Checkout session reference from the payment provider.
    pub session_ref: Option<String>,
    /// Payment intent reference from the payment provider.
    pub intent_ref: Option<String>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Typed status, falling back to `Queued` for unknown strings.
    pub fn status(&self) -> OrderStatus {
        OrderStatus::parse(&self.status).unwrap_or(OrderStatus::Queued)
    }
}

/// Lead record from the persistence layer.
///
/// Leads come from the teaser funnel and use a different intake shape than
/// full orders, but share the payment lifecycle.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeadRecord {
    /// Unique identifier for the lead.
    pub id: String,
    /// Contact email collected by the funnel, if any.
    pub contact_email: Option<String>,
    /// Contact name collected by the funnel, if any.
    pub contact_name: Option<String>,
    /// Selected plan key (e.g. "basic", "premium").
    pub plan: Option<String>,
    /// Current status (queued, pending, paid, failed, generated).
    pub status: String,
    /// When payment was confirmed.
    pub paid_at: Option<DateTime<Utc>>,
    /// Checkout session reference from the payment provider.
    pub session_ref: Option<String>,
    /// Payment intent reference from the payment provider.
    pub intent_ref: Option<String>,
    /// When the lead was created.
    pub created_at: DateTime<Utc>,
}

impl LeadRecord {
    /// Typed status, falling back to `Queued` for unknown strings.
    pub fn status(&self) -> OrderStatus {
        OrderStatus::parse(&self.status).unwrap_or(OrderStatus::Queued)
    }
}

/// Which record set a payment reference resolved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Full order with questionnaire answers.
    Order,
    /// Funnel lead.
    Lead,
}

/// Handle to a record in either set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHandle {
    /// Record set.
    pub kind: RecordKind,
    /// Record identifier.
    pub id: String,
}

impl OrderHandle {
    /// Handle to an order record.
    pub fn order(id: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Order,
            id: id.into(),
        }
    }

    /// Handle to a lead record.
    pub fn lead(id: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Lead,
            id: id.into(),
        }
    }
}

/// Fields for creating a new order at intake.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Customer email. Required.
    pub email: String,
    /// Customer display name.
    pub name: Option<String>,
    /// Normalized questionnaire answers.
    pub answers: Value,
    /// Raw submission payload.
    pub answers_raw: Option<Value>,
    /// Uploaded photo URLs.
    pub photo_urls: Option<Vec<String>>,
}

/// Fields for creating a new lead from the funnel.
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    /// Contact email, if already collected.
    pub contact_email: Option<String>,
    /// Contact name, if already collected.
    pub contact_name: Option<String>,
    /// Selected plan key.
    pub plan: Option<String>,
}

/// Payment confirmation details applied by the reconciler.
///
/// Every field except the timestamps is merge-only: `None` leaves the stored
/// value untouched, `Some` overwrites it. This lets sparse events enrich a
/// record without erasing contact data a richer event already wrote.
#[derive(Debug, Clone)]
pub struct PaidUpdate {
    /// When payment was confirmed.
    pub paid_at: DateTime<Utc>,
    /// Refreshed delivery deadline.
    pub due_at: DateTime<Utc>,
    /// Customer email resolved from the event, if any.
    pub email: Option<String>,
    /// Customer name resolved from the event, if any.
    pub name: Option<String>,
    /// Checkout session reference, if the event carried one.
    pub session_ref: Option<String>,
    /// Payment intent reference, if the event carried one.
    pub intent_ref: Option<String>,
}
