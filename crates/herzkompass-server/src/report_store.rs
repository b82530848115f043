// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage for finished report files.
//!
//! Production writes to a directory on disk; tests use the in-memory
//! implementation. Writing the same name twice overwrites, which is what
//! a repeated generation run wants.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

/// Report storage errors.
#[derive(Debug, Error)]
pub enum ReportStoreError {
    /// Underlying I/O failure.
    #[error("report storage failed for {name}: {source}")]
    Io {
        /// File name involved.
        name: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
}

/// Where finished PDFs go.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Store `bytes` under `name`, replacing any previous content.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ReportStoreError>;

    /// Fetch a stored report.
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ReportStoreError>;
}

/// Directory-backed store.
pub struct FsReportStore {
    dir: PathBuf,
}

impl FsReportStore {
    /// Store reports under `dir`, created on first write.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ReportStoreError> {
        let wrap = |source| ReportStoreError::Io {
            name: name.to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(wrap)?;
        tokio::fs::write(self.dir.join(name), bytes)
            .await
            .map_err(wrap)
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ReportStoreError> {
        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ReportStoreError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryReportStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryReportStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ReportStoreError> {
        if let Ok(mut files) = self.files.lock() {
            files.insert(name.to_string(), bytes.to_vec());
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ReportStoreError> {
        Ok(self
            .files
            .lock()
            .ok()
            .and_then(|files| files.get(name).cloned()))
    }
}
