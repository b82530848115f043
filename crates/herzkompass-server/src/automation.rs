// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Automation webhook forwarding.
//!
//! Posts a small JSON event to the configured automation endpoint whenever
//! a record turns paid. The reconciler treats failures as non-fatal.

use std::time::Duration;

use async_trait::async_trait;

use herzkompass_core::automation::{AutomationEvent, AutomationForwarder, ForwardError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP forwarder for paid events.
pub struct HttpAutomationForwarder {
    http: reqwest::Client,
    url: String,
}

impl HttpAutomationForwarder {
    /// Forwarder posting to `url`.
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            url,
        }
    }
}

#[async_trait]
impl AutomationForwarder for HttpAutomationForwarder {
    async fn forward(&self, event: &AutomationEvent) -> Result<(), ForwardError> {
        let response = self
            .http
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| ForwardError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ForwardError::Delivery(format!(
                "HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}
