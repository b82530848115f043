// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Webhook ingestion primitives.
//!
//! Signature verification and event decoding are kept separate from the
//! reconciler so both can be tested without a database.

pub mod event;
pub mod signature;

pub use event::{
    BillingDetails, Charge, CheckoutSession, CustomerDetails, EventParseError, Expandable,
    PaymentEvent, PaymentIntent, PaypalDetails,
};
pub use signature::{SignatureError, verify_signature};
