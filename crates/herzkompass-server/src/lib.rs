// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Herzkompass HTTP API server.
//!
//! Routes:
//!
//! | Method | Path                   | Purpose                                  |
//! |--------|------------------------|------------------------------------------|
//! | GET    | `/health`              | Database reachability                    |
//! | POST   | `/api/checkout`        | Order intake + hosted checkout session   |
//! | POST   | `/api/lead-checkout`   | Funnel lead + plan-priced checkout       |
//! | POST   | `/api/stripe/webhook`  | Signed payment events                    |
//! | POST   | `/api/worker/generate` | Report generation (worker, bearer token) |
//!
//! Business rules live in `herzkompass-core` (state machine, reconciliation)
//! and `herzkompass-report` (PDF pipeline); this crate wires them to HTTP,
//! Stripe, Resend and the filesystem.

#![deny(missing_docs)]

pub mod automation;
pub mod config;
pub mod error;
pub mod mailer;
pub mod orchestrator;
pub mod report_store;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::{Config, ConfigError};
pub use state::{AppState, router};
