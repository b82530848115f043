// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for herzkompass-core.
//!
//! This module defines the order store abstraction and backend implementations.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresOrderStore;
pub use self::sqlite::SqliteOrderStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::order::{LeadRecord, NewLead, NewOrder, OrderHandle, OrderRecord, PaidUpdate};

/// Which provider reference column to match when resolving a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Checkout session id.
    Session,
    /// Payment intent id.
    Intent,
}

/// Store interface used by the intake routes, the reconciler and the
/// delivery worker.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order in `queued` status with a fresh delivery deadline.
    async fn create_order(&self, new: NewOrder) -> Result<OrderRecord, CoreError>;

    /// Fetch an order by id.
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, CoreError>;

    /// Attach checkout references to an order and move it to `pending`.
    /// A settled order keeps its status; only the references are updated.
    async fn attach_order_checkout(
        &self,
        order_id: &str,
        session_ref: &str,
        intent_ref: Option<&str>,
    ) -> Result<(), CoreError>;

    /// Insert a new lead in `queued` status.
    async fn create_lead(&self, new: NewLead) -> Result<LeadRecord, CoreError>;

    /// Fetch a lead by id.
    async fn get_lead(&self, lead_id: &str) -> Result<Option<LeadRecord>, CoreError>;

    /// Attach checkout references to a lead and move it to `pending`.
    /// A settled lead keeps its status; only the references are updated.
    async fn attach_lead_checkout(
        &self,
        lead_id: &str,
        plan: Option<&str>,
        session_ref: &str,
        intent_ref: Option<&str>,
    ) -> Result<(), CoreError>;

    /// Find the record a provider reference points at. Orders are probed
    /// before leads.
    async fn find_by_reference(
        &self,
        kind: ReferenceKind,
        reference: &str,
    ) -> Result<Option<OrderHandle>, CoreError>;

    /// Resolve a bare record id carried in event metadata. Orders are probed
    /// before leads.
    async fn resolve_handle(&self, id: &str) -> Result<Option<OrderHandle>, CoreError>;

    /// Mark a record paid unless it is already settled.
    ///
    /// The update is a single conditional statement so that concurrent
    /// webhook deliveries cannot both apply it. Returns true if the record
    /// transitioned to `paid`, false if it was already settled.
    async fn mark_paid_if_unpaid(
        &self,
        handle: &OrderHandle,
        update: &PaidUpdate,
    ) -> Result<bool, CoreError>;

    /// Mark a record failed unless it is already settled.
    ///
    /// Returns true if the failure was recorded, false if a confirmed
    /// payment clamped it.
    async fn mark_failed_if_unpaid(
        &self,
        handle: &OrderHandle,
        session_ref: Option<&str>,
        intent_ref: Option<&str>,
    ) -> Result<bool, CoreError>;

    /// Mark an order's report as rendered and stored.
    async fn mark_generated(&self, order_id: &str) -> Result<(), CoreError>;

    /// Record when the report email went out.
    async fn mark_delivered(
        &self,
        order_id: &str,
        delivered_at: DateTime<Utc>,
    ) -> Result<(), CoreError>;

    /// Verify the backing database is reachable.
    async fn health_check(&self) -> Result<(), CoreError>;
}
