// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Report delivery mail.
//!
//! Sends the finished PDF as an attachment through Resend. Delivery is
//! best-effort from the orchestrator's point of view; a failure leaves the
//! order generated but not delivered and a later run retries.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

const RESEND_URL: &str = "https://api.resend.com/emails";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Mail delivery errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// Request or transport failure.
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// One outgoing report mail.
#[derive(Debug, Clone)]
pub struct ReportMail {
    /// Recipient address.
    pub to: String,
    /// Recipient name for the salutation, if known.
    pub name: Option<String>,
    /// Attachment file name.
    pub filename: String,
    /// PDF bytes.
    pub pdf: Vec<u8>,
}

/// Sends report mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one report.
    async fn send(&self, mail: &ReportMail) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
    attachments: [ResendAttachment<'a>; 1],
}

#[derive(Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    content: String,
}

/// Resend-backed mailer.
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
    url: String,
}

impl ResendMailer {
    /// Mailer against the public Resend API.
    pub fn new(api_key: String, from: String) -> Self {
        Self::with_url(api_key, from, RESEND_URL.to_string())
    }

    /// Mailer against an alternate endpoint, used by tests.
    pub fn with_url(api_key: String, from: String, url: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
            from,
            url,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, mail: &ReportMail) -> Result<(), MailError> {
        let salutation = match &mail.name {
            Some(name) => format!("Hallo {name},"),
            None => "Hallo,".to_string(),
        };
        let request = ResendRequest {
            from: &self.from,
            to: [mail.to.as_str()],
            subject: "Deine persönliche Dating-Analyse",
            html: format!(
                "<p>{salutation}</p>\
                 <p>deine persönliche Analyse ist fertig. Du findest sie im Anhang dieser E-Mail.</p>\
                 <p>Herzliche Grüße<br>dein Herzkompass-Team</p>"
            ),
            attachments: [ResendAttachment {
                filename: &mail.filename,
                content: base64::engine::general_purpose::STANDARD.encode(&mail.pdf),
            }],
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Delivery(format!("HTTP {status}: {body}")));
        }

        Ok(())
    }
}

/// Test mailer that records sent mail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<ReportMail>>,
    fail: bool,
}

impl RecordingMailer {
    /// Mailer that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailer that rejects everything.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Mails accepted so far.
    pub fn sent(&self) -> Vec<ReportMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &ReportMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Delivery("rejected by test mailer".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        Ok(())
    }
}
