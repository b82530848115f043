// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the SQLite order store.
//!
//! The PostgreSQL backend runs the same statements modulo placeholder and
//! enum-cast syntax, so these tests cover the shared semantics, in
//! particular the conditional payment transitions.

use chrono::{Duration, Utc};
use serde_json::json;

use herzkompass_core::error::CoreError;
use herzkompass_core::order::{
    NewLead, NewOrder, OrderHandle, OrderStatus, PaidUpdate, due_at_from,
};
use herzkompass_core::store::{OrderStore, ReferenceKind, SqliteOrderStore};

async fn store() -> SqliteOrderStore {
    SqliteOrderStore::in_memory()
        .await
        .expect("in-memory store")
}

fn new_order(email: &str) -> NewOrder {
    NewOrder {
        email: email.to_string(),
        name: Some("Anna".to_string()),
        answers: json!({ "deepestLonging": "naehe-verbundenheit" }),
        answers_raw: None,
        photo_urls: None,
    }
}

fn paid_update() -> PaidUpdate {
    let now = Utc::now();
    PaidUpdate {
        paid_at: now,
        due_at: due_at_from(now),
        email: None,
        name: None,
        session_ref: None,
        intent_ref: None,
    }
}

#[tokio::test]
async fn test_create_and_get_order() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");

    assert_eq!(order.status(), OrderStatus::Queued);
    assert_eq!(order.email, "anna@example.com");
    assert_eq!(order.name.as_deref(), Some("Anna"));
    assert!(order.paid_at.is_none());
    assert!(order.session_ref.is_none());

    // Delivery deadline is ten hours out from intake.
    let window = order.due_at - order.created_at;
    assert_eq!(window.num_hours(), 10);

    let fetched = store
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(fetched.id, order.id);
    assert_eq!(
        fetched.answers.0["deepestLonging"],
        json!("naehe-verbundenheit")
    );

    let missing = store.get_order("no-such-id").await.expect("query ok");
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_attach_order_checkout() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");

    store
        .attach_order_checkout(&order.id, "cs_123", Some("pi_456"))
        .await
        .expect("attach checkout");

    let updated = store
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(updated.status(), OrderStatus::Pending);
    assert_eq!(updated.session_ref.as_deref(), Some("cs_123"));
    assert_eq!(updated.intent_ref.as_deref(), Some("pi_456"));

    let err = store
        .attach_order_checkout("no-such-id", "cs_x", None)
        .await
        .expect_err("unknown order");
    assert!(matches!(err, CoreError::OrderNotFound { .. }));
}

#[tokio::test]
async fn test_mark_paid_is_idempotent() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    let handle = OrderHandle::order(order.id.clone());

    let first = store
        .mark_paid_if_unpaid(&handle, &paid_update())
        .await
        .expect("first transition");
    assert!(first, "first paid transition applies");

    let second = store
        .mark_paid_if_unpaid(&handle, &paid_update())
        .await
        .expect("second transition");
    assert!(!second, "second paid transition is a no-op");

    let paid = store
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(paid.status(), OrderStatus::Paid);
    assert!(paid.paid_at.is_some());
}

#[tokio::test]
async fn test_paid_refreshes_due_at() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    let handle = OrderHandle::order(order.id.clone());

    // Simulate payment well after intake.
    let paid_at = Utc::now() + Duration::hours(3);
    let update = PaidUpdate {
        paid_at,
        due_at: due_at_from(paid_at),
        email: None,
        name: None,
        session_ref: None,
        intent_ref: None,
    };
    assert!(store.mark_paid_if_unpaid(&handle, &update).await.expect("paid"));

    let paid = store
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert!(paid.due_at > order.due_at, "deadline restarts at payment");
    assert_eq!((paid.due_at - paid_at).num_hours(), 10);
}

#[tokio::test]
async fn test_paid_update_merges_contact_fields() {
    let store = store().await;
    let order = store
        .create_order(new_order("original@example.com"))
        .await
        .expect("create order");
    let handle = OrderHandle::order(order.id.clone());

    // None fields keep existing data, Some fields overwrite.
    let mut update = paid_update();
    update.name = None;
    update.email = None;
    update.intent_ref = Some("pi_9".to_string());
    assert!(store.mark_paid_if_unpaid(&handle, &update).await.expect("paid"));

    let paid = store
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(paid.email, "original@example.com");
    assert_eq!(paid.name.as_deref(), Some("Anna"));
    assert_eq!(paid.intent_ref.as_deref(), Some("pi_9"));
}

#[tokio::test]
async fn test_failure_clamped_after_payment() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    let handle = OrderHandle::order(order.id.clone());

    assert!(
        store
            .mark_paid_if_unpaid(&handle, &paid_update())
            .await
            .expect("paid")
    );

    let applied = store
        .mark_failed_if_unpaid(&handle, None, Some("pi_1"))
        .await
        .expect("failed transition");
    assert!(!applied, "failure must not demote a paid record");

    let record = store
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(record.status(), OrderStatus::Paid);
}

#[tokio::test]
async fn test_failed_then_paid_recovers() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    let handle = OrderHandle::order(order.id.clone());

    assert!(
        store
            .mark_failed_if_unpaid(&handle, None, None)
            .await
            .expect("failed transition")
    );
    assert_eq!(
        store
            .get_order(&order.id)
            .await
            .expect("get")
            .expect("exists")
            .status(),
        OrderStatus::Failed
    );

    // Async payment methods may fail once and then succeed.
    assert!(
        store
            .mark_paid_if_unpaid(&handle, &paid_update())
            .await
            .expect("paid transition")
    );
    assert_eq!(
        store
            .get_order(&order.id)
            .await
            .expect("get")
            .expect("exists")
            .status(),
        OrderStatus::Paid
    );
}

#[tokio::test]
async fn test_reattach_does_not_demote_paid_order() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    let handle = OrderHandle::order(order.id.clone());
    assert!(
        store
            .mark_paid_if_unpaid(&handle, &paid_update())
            .await
            .expect("paid")
    );

    // A repeated checkout call re-attaches a fresh session. The new
    // references are kept but the settled status must survive.
    store
        .attach_order_checkout(&order.id, "cs_retry", Some("pi_retry"))
        .await
        .expect("attach checkout");

    let record = store
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(record.status(), OrderStatus::Paid);
    assert_eq!(record.session_ref.as_deref(), Some("cs_retry"));
    assert_eq!(record.intent_ref.as_deref(), Some("pi_retry"));
}

#[tokio::test]
async fn test_reattach_does_not_demote_paid_lead() {
    let store = store().await;
    let lead = store
        .create_lead(NewLead {
            plan: Some("1month".to_string()),
            ..NewLead::default()
        })
        .await
        .expect("create lead");
    let handle = OrderHandle::lead(lead.id.clone());
    assert!(
        store
            .mark_paid_if_unpaid(&handle, &paid_update())
            .await
            .expect("paid")
    );

    store
        .attach_lead_checkout(&lead.id, Some("3month"), "cs_retry", None)
        .await
        .expect("attach checkout");

    let record = store
        .get_lead(&lead.id)
        .await
        .expect("get lead")
        .expect("lead exists");
    assert_eq!(record.status(), OrderStatus::Paid);
    assert_eq!(record.plan.as_deref(), Some("3month"));
    assert_eq!(record.session_ref.as_deref(), Some("cs_retry"));
}

#[tokio::test]
async fn test_find_by_reference() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    store
        .attach_order_checkout(&order.id, "cs_abc", Some("pi_abc"))
        .await
        .expect("attach checkout");

    let by_session = store
        .find_by_reference(ReferenceKind::Session, "cs_abc")
        .await
        .expect("query ok");
    assert_eq!(by_session, Some(OrderHandle::order(order.id.clone())));

    let by_intent = store
        .find_by_reference(ReferenceKind::Intent, "pi_abc")
        .await
        .expect("query ok");
    assert_eq!(by_intent, Some(OrderHandle::order(order.id.clone())));

    let none = store
        .find_by_reference(ReferenceKind::Session, "cs_unknown")
        .await
        .expect("query ok");
    assert!(none.is_none());
}

#[tokio::test]
async fn test_lead_lifecycle() {
    let store = store().await;
    let lead = store
        .create_lead(NewLead {
            contact_email: None,
            contact_name: None,
            plan: Some("basic".to_string()),
        })
        .await
        .expect("create lead");
    assert_eq!(lead.status(), OrderStatus::Queued);

    store
        .attach_lead_checkout(&lead.id, Some("premium"), "cs_lead", None)
        .await
        .expect("attach checkout");

    let handle = store
        .find_by_reference(ReferenceKind::Session, "cs_lead")
        .await
        .expect("query ok")
        .expect("lead found");
    assert_eq!(handle, OrderHandle::lead(lead.id.clone()));

    let mut update = paid_update();
    update.email = Some("payer@example.com".to_string());
    assert!(store.mark_paid_if_unpaid(&handle, &update).await.expect("paid"));

    let paid = store
        .get_lead(&lead.id)
        .await
        .expect("get lead")
        .expect("lead exists");
    assert_eq!(paid.status(), OrderStatus::Paid);
    assert_eq!(paid.plan.as_deref(), Some("premium"));
    assert_eq!(paid.contact_email.as_deref(), Some("payer@example.com"));
}

#[tokio::test]
async fn test_resolve_handle_probes_orders_then_leads() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    let lead = store.create_lead(NewLead::default()).await.expect("create lead");

    assert_eq!(
        store.resolve_handle(&order.id).await.expect("query ok"),
        Some(OrderHandle::order(order.id.clone()))
    );
    assert_eq!(
        store.resolve_handle(&lead.id).await.expect("query ok"),
        Some(OrderHandle::lead(lead.id.clone()))
    );
    assert_eq!(store.resolve_handle("nope").await.expect("query ok"), None);
}

#[tokio::test]
async fn test_mark_generated_and_delivered() {
    let store = store().await;
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    let handle = OrderHandle::order(order.id.clone());
    assert!(
        store
            .mark_paid_if_unpaid(&handle, &paid_update())
            .await
            .expect("paid")
    );

    store.mark_generated(&order.id).await.expect("mark generated");
    let delivered_at = Utc::now();
    store
        .mark_delivered(&order.id, delivered_at)
        .await
        .expect("mark delivered");

    let record = store
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(record.status(), OrderStatus::Generated);
    assert!(record.delivered_at.is_some());

    let err = store
        .mark_generated("no-such-id")
        .await
        .expect_err("unknown order");
    assert!(matches!(err, CoreError::OrderNotFound { .. }));
}

#[tokio::test]
async fn test_from_path_creates_and_migrates() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("orders.db");

    let store = SqliteOrderStore::from_path(&path)
        .await
        .expect("store from path");
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");

    // A second open against the same file sees the data.
    let reopened = SqliteOrderStore::from_path(&path)
        .await
        .expect("reopen store");
    let fetched = reopened
        .get_order(&order.id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(fetched.email, "anna@example.com");
}

#[tokio::test]
async fn test_concurrent_paid_deliveries_apply_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = std::sync::Arc::new(
        SqliteOrderStore::from_path(dir.path().join("orders.db"))
            .await
            .expect("store from path"),
    );
    let order = store
        .create_order(new_order("anna@example.com"))
        .await
        .expect("create order");
    let handle = OrderHandle::order(order.id.clone());

    // A provider redelivers the same event on several connections at once;
    // the conditional update must let exactly one through.
    let attempts = futures::future::join_all((0..8).map(|_| {
        let store = store.clone();
        let handle = handle.clone();
        async move { store.mark_paid_if_unpaid(&handle, &paid_update()).await }
    }))
    .await;

    let applied = attempts
        .into_iter()
        .map(|r| r.expect("transition query"))
        .filter(|applied| *applied)
        .count();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn test_health_check() {
    let store = store().await;
    store.health_check().await.expect("database reachable");
}
