// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed order store implementation.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::CoreError;
use crate::order::{
    LeadRecord, NewLead, NewOrder, OrderHandle, OrderRecord, PaidUpdate, RecordKind, due_at_from,
};

use super::{OrderStore, ReferenceKind};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

/// SQLite-backed order store.
#[derive(Clone)]
pub struct SqliteOrderStore {
    pool: SqlitePool,
}

impl SqliteOrderStore {
    /// Create a new SQLite order store from an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a new SQLite order store from a file path.
    ///
    /// This convenience constructor handles all setup:
    /// - Creates parent directories if they don't exist
    /// - Creates the database file if it doesn't exist
    /// - Connects to the database with sensible defaults
    /// - Runs all migrations
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::DatabaseError {
                operation: "create_dir".to_string(),
                details: format!("Failed to create directory {:?}: {}", parent, e),
            })?;
        }

        let path_str = path.to_string_lossy();
        let url = format!("sqlite:{}?mode=rwc", path_str);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to connect to SQLite at {:?}: {}", path, e),
            })?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;

        Ok(Self { pool })
    }

    /// Create an in-memory store with migrations applied. Used by tests and
    /// local development.
    pub async fn in_memory() -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "connect".to_string(),
                details: format!("Failed to open in-memory SQLite: {}", e),
            })?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| CoreError::DatabaseError {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;

        Ok(Self { pool })
    }
}

const ORDER_COLUMNS: &str = "id, email, name, status, answers, answers_raw, photo_urls, \
     due_at, paid_at, delivered_at, session_ref, intent_ref, created_at";

const LEAD_COLUMNS: &str =
    "id, contact_email, contact_name, plan, status, paid_at, session_ref, intent_ref, created_at";

#[async_trait::async_trait]
impl OrderStore for SqliteOrderStore {
    async fn create_order(&self, new: NewOrder) -> Result<OrderRecord, CoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let due_at = due_at_from(now);

        sqlx::query(
            r#"
            INSERT INTO orders (id, email, name, status, answers, answers_raw, photo_urls,
                                due_at, created_at)
            VALUES (?, ?, ?, 'queued', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.email)
        .bind(&new.name)
        .bind(Json(&new.answers))
        .bind(new.answers_raw.as_ref().map(Json))
        .bind(new.photo_urls.as_ref().map(Json))
        .bind(due_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let record = self
            .get_order(&id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound {
                order_id: id.clone(),
            })?;
        Ok(record)
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, CoreError> {
        let record = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn attach_order_checkout(
        &self,
        order_id: &str,
        session_ref: &str,
        intent_ref: Option<&str>,
    ) -> Result<(), CoreError> {
        // Re-attaching after payment keeps the new references but must not
        // demote a settled status.
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = CASE
                    WHEN status IN ('paid', 'generated') THEN status
                    ELSE 'pending'
                END,
                session_ref = ?,
                intent_ref = COALESCE(?, intent_ref)
            WHERE id = ?
            "#,
        )
        .bind(session_ref)
        .bind(intent_ref)
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        }

        Ok(())
    }

    async fn create_lead(&self, new: NewLead) -> Result<LeadRecord, CoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO leads (id, contact_email, contact_name, plan, status, created_at)
            VALUES (?, ?, ?, ?, 'queued', ?)
            "#,
        )
        .bind(&id)
        .bind(&new.contact_email)
        .bind(&new.contact_name)
        .bind(&new.plan)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let record = self
            .get_lead(&id)
            .await?
            .ok_or_else(|| CoreError::LeadNotFound {
                lead_id: id.clone(),
            })?;
        Ok(record)
    }

    async fn get_lead(&self, lead_id: &str) -> Result<Option<LeadRecord>, CoreError> {
        let record = sqlx::query_as::<_, LeadRecord>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?"
        ))
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn attach_lead_checkout(
        &self,
        lead_id: &str,
        plan: Option<&str>,
        session_ref: &str,
        intent_ref: Option<&str>,
    ) -> Result<(), CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET status = CASE
                    WHEN status IN ('paid', 'generated') THEN status
                    ELSE 'pending'
                END,
                plan = COALESCE(?, plan),
                session_ref = ?,
                intent_ref = COALESCE(?, intent_ref)
            WHERE id = ?
            "#,
        )
        .bind(plan)
        .bind(session_ref)
        .bind(intent_ref)
        .bind(lead_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::LeadNotFound {
                lead_id: lead_id.to_string(),
            });
        }

        Ok(())
    }

    async fn find_by_reference(
        &self,
        kind: ReferenceKind,
        reference: &str,
    ) -> Result<Option<OrderHandle>, CoreError> {
        let column = match kind {
            ReferenceKind::Session => "session_ref",
            ReferenceKind::Intent => "intent_ref",
        };

        let order_id: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT id FROM orders WHERE {column} = ? LIMIT 1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id,)) = order_id {
            return Ok(Some(OrderHandle::order(id)));
        }

        let lead_id: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT id FROM leads WHERE {column} = ? LIMIT 1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead_id.map(|(id,)| OrderHandle::lead(id)))
    }

    async fn resolve_handle(&self, id: &str) -> Result<Option<OrderHandle>, CoreError> {
        let in_orders: Option<(String,)> = sqlx::query_as("SELECT id FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some((id,)) = in_orders {
            return Ok(Some(OrderHandle::order(id)));
        }

        let in_leads: Option<(String,)> = sqlx::query_as("SELECT id FROM leads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(in_leads.map(|(id,)| OrderHandle::lead(id)))
    }

    async fn mark_paid_if_unpaid(
        &self,
        handle: &OrderHandle,
        update: &PaidUpdate,
    ) -> Result<bool, CoreError> {
        let result = match handle.kind {
            RecordKind::Order => {
                sqlx::query(
                    r#"
                    UPDATE orders
                    SET status = 'paid',
                        paid_at = ?,
                        due_at = ?,
                        email = COALESCE(?, email),
                        name = COALESCE(?, name),
                        session_ref = COALESCE(?, session_ref),
                        intent_ref = COALESCE(?, intent_ref)
                    WHERE id = ? AND status NOT IN ('paid', 'generated')
                    "#,
                )
                .bind(update.paid_at)
                .bind(update.due_at)
                .bind(&update.email)
                .bind(&update.name)
                .bind(&update.session_ref)
                .bind(&update.intent_ref)
                .bind(&handle.id)
                .execute(&self.pool)
                .await?
            }
            RecordKind::Lead => {
                sqlx::query(
                    r#"
                    UPDATE leads
                    SET status = 'paid',
                        paid_at = ?,
                        contact_email = COALESCE(?, contact_email),
                        contact_name = COALESCE(?, contact_name),
                        session_ref = COALESCE(?, session_ref),
                        intent_ref = COALESCE(?, intent_ref)
                    WHERE id = ? AND status NOT IN ('paid', 'generated')
                    "#,
                )
                .bind(update.paid_at)
                .bind(&update.email)
                .bind(&update.name)
                .bind(&update.session_ref)
                .bind(&update.intent_ref)
                .bind(&handle.id)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed_if_unpaid(
        &self,
        handle: &OrderHandle,
        session_ref: Option<&str>,
        intent_ref: Option<&str>,
    ) -> Result<bool, CoreError> {
        let table = match handle.kind {
            RecordKind::Order => "orders",
            RecordKind::Lead => "leads",
        };

        let result = sqlx::query(&format!(
            r#"
            UPDATE {table}
            SET status = 'failed',
                session_ref = COALESCE(?, session_ref),
                intent_ref = COALESCE(?, intent_ref)
            WHERE id = ? AND status NOT IN ('paid', 'generated')
            "#
        ))
        .bind(session_ref)
        .bind(intent_ref)
        .bind(&handle.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_generated(&self, order_id: &str) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE orders SET status = 'generated' WHERE id = ?")
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        }

        Ok(())
    }

    async fn mark_delivered(
        &self,
        order_id: &str,
        delivered_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE orders SET delivered_at = ? WHERE id = ?")
            .bind(delivered_at)
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::OrderNotFound {
                order_id: order_id.to_string(),
            });
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
