// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed order store.
//!
//! Provides durable storage for orders and leads, including the conditional
//! payment transitions the reconciler relies on for idempotency.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::CoreError;
use crate::order::{
    LeadRecord, NewLead, NewOrder, OrderHandle, OrderRecord, PaidUpdate, RecordKind, due_at_from,
};

use super::{OrderStore, ReferenceKind};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Create a new Postgres-backed order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = "id, email, name, status::text as status, answers, answers_raw, \
     photo_urls, due_at, paid_at, delivered_at, session_ref, intent_ref, created_at";

const LEAD_COLUMNS: &str = "id, contact_email, contact_name, plan, status::text as status, \
     paid_at, session_ref, intent_ref, created_at";

#[async_trait::async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_order(&self, new: NewOrder) -> Result<OrderRecord, CoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let due_at = due_at_from(now);

        sqlx::query(
            r#"
            INSERT INTO orders (id, email, name, status, answers, answers_raw, photo_urls,
                                due_at, created_at)
            VALUES ($1, $2, $3, 'queued'::order_status, $4, $5, $6, $7, $8)
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
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
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
                    WHEN status IN ('paid'::order_status, 'generated'::order_status)
                        THEN status
                    ELSE 'pending'::order_status
                END,
                session_ref = $2,
                intent_ref = COALESCE($3, intent_ref)
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(session_ref)
        .bind(intent_ref)
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
            VALUES ($1, $2, $3, $4, 'queued'::order_status, $5)
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
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"
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
                    WHEN status IN ('paid'::order_status, 'generated'::order_status)
                        THEN status
                    ELSE 'pending'::order_status
                END,
                plan = COALESCE($2, plan),
                session_ref = $3,
                intent_ref = COALESCE($4, intent_ref)
            WHERE id = $1
            "#,
        )
        .bind(lead_id)
        .bind(plan)
        .bind(session_ref)
        .bind(intent_ref)
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
            "SELECT id FROM orders WHERE {column} = $1 LIMIT 1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id,)) = order_id {
            return Ok(Some(OrderHandle::order(id)));
        }

        let lead_id: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT id FROM leads WHERE {column} = $1 LIMIT 1"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead_id.map(|(id,)| OrderHandle::lead(id)))
    }

    async fn resolve_handle(&self, id: &str) -> Result<Option<OrderHandle>, CoreError> {
        let in_orders: Option<(String,)> =
            sqlx::query_as("SELECT id FROM orders WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        if let Some((id,)) = in_orders {
            return Ok(Some(OrderHandle::order(id)));
        }

        let in_leads: Option<(String,)> = sqlx::query_as("SELECT id FROM leads WHERE id = $1")
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
                    SET status = 'paid'::order_status,
                        paid_at = $2,
                        due_at = $3,
                        email = COALESCE($4, email),
                        name = COALESCE($5, name),
                        session_ref = COALESCE($6, session_ref),
                        intent_ref = COALESCE($7, intent_ref)
                    WHERE id = $1
                      AND status NOT IN ('paid'::order_status, 'generated'::order_status)
                    "#,
                )
                .bind(&handle.id)
                .bind(update.paid_at)
                .bind(update.due_at)
                .bind(&update.email)
                .bind(&update.name)
                .bind(&update.session_ref)
                .bind(&update.intent_ref)
                .execute(&self.pool)
                .await?
            }
            RecordKind::Lead => {
                sqlx::query(
                    r#"
                    UPDATE leads
                    SET status = 'paid'::order_status,
                        paid_at = $2,
                        contact_email = COALESCE($3, contact_email),
                        contact_name = COALESCE($4, contact_name),
                        session_ref = COALESCE($5, session_ref),
                        intent_ref = COALESCE($6, intent_ref)
                    WHERE id = $1
                      AND status NOT IN ('paid'::order_status, 'generated'::order_status)
                    "#,
                )
                .bind(&handle.id)
                .bind(update.paid_at)
                .bind(&update.email)
                .bind(&update.name)
                .bind(&update.session_ref)
                .bind(&update.intent_ref)
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
            SET status = 'failed'::order_status,
                session_ref = COALESCE($2, session_ref),
                intent_ref = COALESCE($3, intent_ref)
            WHERE id = $1
              AND status NOT IN ('paid'::order_status, 'generated'::order_status)
            "#
        ))
        .bind(&handle.id)
        .bind(session_ref)
        .bind(intent_ref)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_generated(&self, order_id: &str) -> Result<(), CoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'generated'::order_status
            WHERE id = $1
            "#,
        )
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
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET delivered_at = $2
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(delivered_at)
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
