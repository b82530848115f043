// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Report generation orchestration.
//!
//! One generation run: load the order, build the paragraph blocks from its
//! answers, render the PDF, store the file, mark the order generated, then
//! try to mail it out. Rendering and storage failures abort the run; mail
//! failure does not, the stored file can be re-sent independently. Runs are
//! idempotent, a repeated run overwrites the stored file with identical
//! bytes.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use herzkompass_core::store::OrderStore;
use herzkompass_core::{CoreError, Result};
use herzkompass_report::{HeaderInfo, Layout, build_blocks, render};

use crate::mailer::{Mailer, ReportMail};
use crate::report_store::ReportStore;

/// Outcome of a generation run.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    /// Order the report belongs to.
    pub order_id: String,
    /// Stored file name.
    pub file: String,
    /// Whether the delivery mail went out in this run.
    pub mailed: bool,
}

/// Drives report generation for paid orders.
pub struct ReportOrchestrator {
    store: Arc<dyn OrderStore>,
    reports: Arc<dyn ReportStore>,
    mailer: Option<Arc<dyn Mailer>>,
    template: Option<Vec<u8>>,
    layout: Layout,
}

impl ReportOrchestrator {
    /// Orchestrator over the given stores. `template` is the PDF the report
    /// is drawn onto; without one, blank pages are synthesized.
    pub fn new(
        store: Arc<dyn OrderStore>,
        reports: Arc<dyn ReportStore>,
        mailer: Option<Arc<dyn Mailer>>,
        template: Option<Vec<u8>>,
    ) -> Self {
        Self {
            store,
            reports,
            mailer,
            template,
            layout: Layout::standard(),
        }
    }

    /// Generate (or regenerate) the report for an order.
    #[instrument(skip(self))]
    pub async fn generate(&self, order_id: &str) -> Result<GeneratedReport> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        let blocks = build_blocks(&order.answers.0);
        let header = HeaderInfo {
            name: order.name.clone(),
            email: Some(order.email.clone()),
            // The order's intake time, so regeneration reproduces the file.
            created_at: order.created_at,
        };

        let pdf = render(self.template.as_deref(), &header, &blocks, &self.layout).map_err(
            |e| CoreError::GenerationError {
                order_id: order_id.to_string(),
                details: e.to_string(),
            },
        )?;

        let file = format!("{order_id}.pdf");
        self.reports
            .put(&file, &pdf)
            .await
            .map_err(|e| CoreError::StorageError {
                operation: "put_report".to_string(),
                details: e.to_string(),
            })?;

        // The document exists and can be re-sent independently, so the order
        // counts as delivered even when the mail below bounces.
        self.store.mark_generated(order_id).await?;
        self.store.mark_delivered(order_id, Utc::now()).await?;
        info!(order_id, file = %file, blocks = blocks.len(), "report generated");

        let mailed = self.try_deliver(&order.email, order.name.as_deref(), &file, pdf).await;

        Ok(GeneratedReport {
            order_id: order_id.to_string(),
            file,
            mailed,
        })
    }

    /// Best-effort delivery. Returns whether the mail was accepted.
    async fn try_deliver(
        &self,
        email: &str,
        name: Option<&str>,
        file: &str,
        pdf: Vec<u8>,
    ) -> bool {
        let Some(mailer) = &self.mailer else {
            return false;
        };
        let mail = ReportMail {
            to: email.to_string(),
            name: name.map(str::to_string),
            filename: file.to_string(),
            pdf,
        };
        match mailer.send(&mail).await {
            Ok(()) => true,
            Err(e) => {
                warn!(file, error = %e, "report mail failed, file stays available for re-send");
                false
            }
        }
    }
}
