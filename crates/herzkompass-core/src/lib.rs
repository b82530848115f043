// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Herzkompass Core - Order and Payment Reconciliation Engine
//!
//! This crate provides the order lifecycle engine behind the Herzkompass
//! report shop. It persists orders and funnel leads, folds asynchronous
//! payment webhooks into a consistent record state, and tracks report
//! delivery, storing all state in PostgreSQL (or SQLite for embedded and
//! test use).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Payment Provider                            │
//! │       (hosted checkout, webhooks, intent/charge lookups)         │
//! └──────────────────────────────────────────────────────────────────┘
//!          │ signed webhooks                   ▲ enrichment lookups
//!          ▼                                   │
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    herzkompass-server                            │
//! │        (intake, webhook endpoint, delivery worker API)           │
//! └──────────────────────────────────────────────────────────────────┘
//!          │
//!          ▼
//! ┌───────────────────────┐
//! │   herzkompass-core    │   signature check -> event decode ->
//! │   (This Crate)        │   reconcile -> conditional transition
//! └───────────────────────┘
//!          │
//!          ▼
//! ┌───────────────────────┐
//! │  PostgreSQL / SQLite  │
//! │  (orders, leads)      │
//! └───────────────────────┘
//! ```
//!
//! # Record State Machine
//!
//! ```text
//!        ┌────────┐
//!        │ QUEUED │
//!        └───┬────┘
//!            │ checkout session created
//!            ▼
//!       ┌─────────┐
//!   ┌───│ PENDING │───┐
//!   │   └─────────┘   │
//!   │ paid            │ payment failed
//!   ▼                 ▼
//! ┌──────┐        ┌────────┐
//! │ PAID │◄───────│ FAILED │   (async retry may still succeed)
//! └──┬───┘        └────────┘
//!    │ report rendered and stored
//!    ▼
//! ┌───────────┐
//! │ GENERATED │
//! └───────────┘
//! ```
//!
//! `PAID` and `GENERATED` are settled: no later event may demote them.
//! `FAILED` is not terminal because asynchronous payment methods (SEPA,
//! some wallets) can fail once and succeed on retry.
//!
//! # Webhook Reconciliation
//!
//! One payment produces several overlapping events, delivered unordered and
//! at-least-once:
//!
//! | Event | Effect |
//! |-------|--------|
//! | `checkout.session.completed` | paid transition |
//! | `checkout.session.async_payment_succeeded` | paid transition |
//! | `checkout.session.async_payment_failed` | failed transition (clamped if settled) |
//! | `payment_intent.succeeded` | paid transition |
//! | `payment_intent.payment_failed` | failed transition (clamped if settled) |
//! | `charge.succeeded` | paid transition |
//! | anything else | acknowledged, ignored |
//!
//! The paid transition is a single conditional update, so redundant and
//! concurrent deliveries collapse into exactly one state change.
//!
//! # Modules
//!
//! - [`automation`]: Downstream notification hook for paid transitions
//! - [`error`]: Unified error type with stable error codes
//! - [`migrations`]: Embedded PostgreSQL and SQLite migrations
//! - [`order`]: Order, lead and status domain types
//! - [`provider`]: Payment provider client abstraction
//! - [`reconciler`]: Event-to-state folding logic
//! - [`store`]: Persistence trait plus PostgreSQL and SQLite backends
//! - [`webhook`]: Signature verification and typed event decoding

#![deny(missing_docs)]

/// Downstream automation notifications for paid transitions.
pub mod automation;

/// Error types for core operations with stable error codes.
pub mod error;

/// Embedded database migrations.
pub mod migrations;

/// Order and lead domain types.
pub mod order;

/// Payment provider client abstraction.
pub mod provider;

/// Payment event reconciliation.
pub mod reconciler;

/// Order store trait and database backends.
pub mod store;

/// Webhook signature verification and event decoding.
pub mod webhook;

pub use error::{CoreError, Result};
