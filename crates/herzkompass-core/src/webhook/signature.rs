// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Webhook signature verification.
//!
//! The provider signs the raw request body with HMAC-SHA256 over
//! `"{timestamp}.{payload}"` and sends the result in a header of the form
//! `t=<unix seconds>,v1=<hex digest>`. A header may carry several `v1`
//! entries during secret rotation; any valid one accepts the request.
//!
//! Verification happens on the raw bytes, before any JSON parsing.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Replay window for signed timestamps.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Errors for structurally invalid signature headers.
///
/// A well-formed header that simply does not match yields `Ok(false)` from
/// [`verify_signature`] instead, so callers can distinguish "garbage header"
/// from "wrong secret" in logs. Both are rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Header had no `t=` element.
    #[error("signature header is missing a timestamp")]
    MissingTimestamp,

    /// Header had no `v1=` element.
    #[error("signature header carries no v1 signature")]
    MissingSignature,

    /// The `t=` element was not an integer.
    #[error("signature timestamp is not a unix timestamp: {value}")]
    BadTimestamp {
        /// The raw timestamp element.
        value: String,
    },
}

/// Verify a webhook signature header against the raw payload.
///
/// Returns `Ok(true)` when some `v1` entry matches and the timestamp is
/// within `tolerance_secs` of `now` (in either direction, to absorb clock
/// skew). Returns `Ok(false)` for stale timestamps and digest mismatches.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    tolerance_secs: i64,
    now: DateTime<Utc>,
) -> Result<bool, SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for element in header.split(',') {
        let element = element.trim();
        if let Some(value) = element.strip_prefix("t=") {
            timestamp = Some(value);
        } else if let Some(value) = element.strip_prefix("v1=") {
            candidates.push(value);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if candidates.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::BadTimestamp {
            value: timestamp.to_string(),
        })?;

    if (now.timestamp() - signed_at).abs() > tolerance_secs {
        return Ok(false);
    }

    let mut signed_payload = Vec::with_capacity(timestamp.len() + 1 + payload.len());
    signed_payload.extend_from_slice(timestamp.as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);

    for candidate in candidates {
        let Ok(digest) = hex::decode(candidate) else {
            continue;
        };
        // new_from_slice only fails on zero-length keys for HMAC, and an
        // empty secret can never have produced a signature anyway.
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return Ok(false);
        };
        mac.update(&signed_payload);
        if mac.verify_slice(&digest).is_ok() {
            return Ok(true);
        }
    }

    Ok(false)
}
