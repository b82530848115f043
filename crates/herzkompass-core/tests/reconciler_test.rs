// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for payment event reconciliation.
//!
//! Exercises the event-to-record resolution precedence, the sticky paid
//! semantics, and graceful degradation when provider lookups fail.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use herzkompass_core::automation::{AutomationEvent, AutomationForwarder, ForwardError};
use herzkompass_core::order::{NewLead, NewOrder, OrderStatus, RecordKind};
use herzkompass_core::provider::{
    CheckoutParams, CreatedCheckout, PaymentProvider, ProviderError,
};
use herzkompass_core::reconciler::{Outcome, Reconciler};
use herzkompass_core::store::{OrderStore, SqliteOrderStore};
use herzkompass_core::webhook::PaymentEvent;

// ----------------------------------------------------------------------
// Fakes
// ----------------------------------------------------------------------

/// Provider fake serving canned intent/charge lookups from JSON fixtures.
#[derive(Default)]
struct FakeProvider {
    intents: HashMap<String, serde_json::Value>,
    charges: HashMap<String, serde_json::Value>,
    failing: bool,
}

impl FakeProvider {
    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn with_intent(mut self, id: &str, object: serde_json::Value) -> Self {
        self.intents.insert(id.to_string(), object);
        self
    }

    fn with_charge(mut self, intent_id: &str, object: serde_json::Value) -> Self {
        self.charges.insert(intent_id.to_string(), object);
        self
    }

    fn error(&self, operation: &str) -> ProviderError {
        ProviderError::Api {
            operation: operation.to_string(),
            status: 500,
            message: "simulated outage".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_checkout_session(
        &self,
        _params: CheckoutParams,
    ) -> Result<CreatedCheckout, ProviderError> {
        Err(self.error("create_checkout_session"))
    }

    async fn retrieve_intent(
        &self,
        intent_id: &str,
    ) -> Result<herzkompass_core::webhook::PaymentIntent, ProviderError> {
        if self.failing {
            return Err(self.error("retrieve_intent"));
        }
        let object = self
            .intents
            .get(intent_id)
            .ok_or_else(|| self.error("retrieve_intent"))?;
        serde_json::from_value(object.clone()).map_err(|e| ProviderError::Request {
            operation: "retrieve_intent".to_string(),
            details: e.to_string(),
        })
    }

    async fn latest_charge_for_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<herzkompass_core::webhook::Charge>, ProviderError> {
        if self.failing {
            return Err(self.error("latest_charge_for_intent"));
        }
        match self.charges.get(intent_id) {
            Some(object) => {
                let charge =
                    serde_json::from_value(object.clone()).map_err(|e| ProviderError::Request {
                        operation: "latest_charge_for_intent".to_string(),
                        details: e.to_string(),
                    })?;
                Ok(Some(charge))
            }
            None => Ok(None),
        }
    }
}

/// Counts forwarded notifications.
#[derive(Default)]
struct RecordingForwarder {
    count: AtomicUsize,
}

#[async_trait::async_trait]
impl AutomationForwarder for RecordingForwarder {
    async fn forward(&self, _event: &AutomationEvent) -> Result<(), ForwardError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

async fn store() -> Arc<SqliteOrderStore> {
    Arc::new(
        SqliteOrderStore::in_memory()
            .await
            .expect("in-memory store"),
    )
}

fn reconciler(
    store: Arc<SqliteOrderStore>,
    provider: Option<FakeProvider>,
) -> Reconciler {
    Reconciler::new(
        store,
        provider.map(|p| Arc::new(p) as Arc<dyn PaymentProvider>),
        None,
    )
}

async fn seed_order(store: &SqliteOrderStore, email: &str) -> String {
    let order = store
        .create_order(NewOrder {
            email: email.to_string(),
            name: None,
            answers: json!({}),
            answers_raw: None,
            photo_urls: None,
        })
        .await
        .expect("create order");
    order.id
}

fn session_completed(body: serde_json::Value) -> PaymentEvent {
    let envelope = json!({
        "type": "checkout.session.completed",
        "data": { "object": body }
    });
    PaymentEvent::parse(envelope.to_string().as_bytes()).expect("valid event")
}

fn event(event_type: &str, body: serde_json::Value) -> PaymentEvent {
    let envelope = json!({
        "type": event_type,
        "data": { "object": body }
    });
    PaymentEvent::parse(envelope.to_string().as_bytes()).expect("valid event")
}

// ----------------------------------------------------------------------
// Paid transitions
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_session_completed_marks_order_paid() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let reconciler = reconciler(store.clone(), None);

    let outcome = reconciler
        .process(session_completed(json!({
            "id": "cs_1",
            "client_reference_id": order_id,
            "customer_details": { "email": "paid@example.com", "name": "Anna Beispiel" },
            "payment_intent": "pi_1"
        })))
        .await
        .expect("reconcile");

    assert!(matches!(outcome, Outcome::Paid { .. }));

    let order = store
        .get_order(&order_id)
        .await
        .expect("get order")
        .expect("order exists");
    assert_eq!(order.status(), OrderStatus::Paid);
    assert_eq!(order.email, "paid@example.com");
    assert_eq!(order.name.as_deref(), Some("Anna Beispiel"));
    assert_eq!(order.session_ref.as_deref(), Some("cs_1"));
    assert_eq!(order.intent_ref.as_deref(), Some("pi_1"));

    let paid_at = order.paid_at.expect("paid_at set");
    assert_eq!((order.due_at - paid_at).num_hours(), 10);
}

#[tokio::test]
async fn test_duplicate_delivery_is_noop() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let reconciler = reconciler(store.clone(), None);

    let body = json!({ "id": "cs_1", "client_reference_id": order_id });
    let first = reconciler
        .process(session_completed(body.clone()))
        .await
        .expect("first delivery");
    assert!(matches!(first, Outcome::Paid { .. }));

    let paid_at = store
        .get_order(&order_id)
        .await
        .expect("get")
        .expect("exists")
        .paid_at;

    let second = reconciler
        .process(session_completed(body))
        .await
        .expect("second delivery");
    assert!(matches!(second, Outcome::AlreadySettled { .. }));

    let after = store
        .get_order(&order_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(after.paid_at, paid_at, "retry must not touch the record");
}

#[tokio::test]
async fn test_overlapping_events_any_order() {
    // charge.succeeded and payment_intent.succeeded describe the same
    // payment; whichever lands first wins, the other is a no-op.
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    store
        .attach_order_checkout(&order_id, "cs_1", Some("pi_1"))
        .await
        .expect("attach checkout");
    let reconciler = reconciler(store.clone(), None);

    let charge = event(
        "charge.succeeded",
        json!({
            "id": "ch_1",
            "payment_intent": "pi_1",
            "billing_details": { "email": "card@example.com", "name": "K. Karte" }
        }),
    );
    let intent = event("payment_intent.succeeded", json!({ "id": "pi_1" }));

    assert!(matches!(
        reconciler.process(charge).await.expect("charge first"),
        Outcome::Paid { .. }
    ));
    assert!(matches!(
        reconciler.process(intent).await.expect("intent second"),
        Outcome::AlreadySettled { .. }
    ));

    let order = store
        .get_order(&order_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(order.status(), OrderStatus::Paid);
    assert_eq!(order.email, "card@example.com");
}

// ----------------------------------------------------------------------
// Resolution precedence
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_client_reference_outranks_stored_reference() {
    let store = store().await;
    let target = seed_order(&store, "target@example.com").await;
    let decoy = seed_order(&store, "decoy@example.com").await;
    // The decoy holds the session reference, but the explicit client
    // reference on the event must win.
    store
        .attach_order_checkout(&decoy, "cs_shared", None)
        .await
        .expect("attach checkout");
    let reconciler = reconciler(store.clone(), None);

    let outcome = reconciler
        .process(session_completed(json!({
            "id": "cs_shared",
            "client_reference_id": target
        })))
        .await
        .expect("reconcile");

    let Outcome::Paid { handle } = outcome else {
        panic!("expected paid outcome");
    };
    assert_eq!(handle.id, target);
    assert_eq!(handle.kind, RecordKind::Order);

    let decoy_record = store
        .get_order(&decoy)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(decoy_record.status(), OrderStatus::Queued);
}

#[tokio::test]
async fn test_client_reference_outranks_metadata() {
    let store = store().await;
    let target = seed_order(&store, "target@example.com").await;
    let decoy = seed_order(&store, "decoy@example.com").await;
    let reconciler = reconciler(store.clone(), None);

    // Both identifiers resolve; the explicit client reference must win.
    let outcome = reconciler
        .process(session_completed(json!({
            "id": "cs_conflict",
            "client_reference_id": target,
            "metadata": { "order_id": decoy }
        })))
        .await
        .expect("reconcile");

    let Outcome::Paid { handle } = outcome else {
        panic!("expected paid outcome");
    };
    assert_eq!(handle.id, target);

    let decoy_record = store
        .get_order(&decoy)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(
        decoy_record.status(),
        OrderStatus::Queued,
        "metadata target must stay untouched"
    );
}

#[tokio::test]
async fn test_metadata_resolution() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let reconciler = reconciler(store.clone(), None);

    let outcome = reconciler
        .process(event(
            "payment_intent.succeeded",
            json!({ "id": "pi_7", "metadata": { "order_id": order_id } }),
        ))
        .await
        .expect("reconcile");

    assert!(matches!(outcome, Outcome::Paid { .. }));
    let order = store
        .get_order(&order_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(order.intent_ref.as_deref(), Some("pi_7"));
}

#[tokio::test]
async fn test_stored_session_reference_fallback() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    store
        .attach_order_checkout(&order_id, "cs_9", None)
        .await
        .expect("attach checkout");
    let reconciler = reconciler(store.clone(), None);

    // No client_reference_id, no metadata: only the stored ref matches.
    let outcome = reconciler
        .process(session_completed(json!({ "id": "cs_9" })))
        .await
        .expect("reconcile");
    assert!(matches!(outcome, Outcome::Paid { .. }));
}

#[tokio::test]
async fn test_lead_resolved_by_session_reference() {
    let store = store().await;
    let lead = store.create_lead(NewLead::default()).await.expect("create lead");
    store
        .attach_lead_checkout(&lead.id, Some("basic"), "cs_lead", None)
        .await
        .expect("attach checkout");
    let reconciler = reconciler(store.clone(), None);

    let outcome = reconciler
        .process(session_completed(json!({
            "id": "cs_lead",
            "customer_details": { "email": "funnel@example.com", "name": "F. Trichter" }
        })))
        .await
        .expect("reconcile");

    let Outcome::Paid { handle } = outcome else {
        panic!("expected paid outcome");
    };
    assert_eq!(handle.kind, RecordKind::Lead);

    let paid = store
        .get_lead(&lead.id)
        .await
        .expect("get lead")
        .expect("lead exists");
    assert_eq!(paid.status(), OrderStatus::Paid);
    assert_eq!(paid.contact_email.as_deref(), Some("funnel@example.com"));
}

#[tokio::test]
async fn test_unmatched_event_is_dropped() {
    let store = store().await;
    let reconciler = reconciler(store.clone(), None);

    let outcome = reconciler
        .process(session_completed(json!({
            "id": "cs_ghost",
            "client_reference_id": "never-created"
        })))
        .await
        .expect("reconcile must not error");

    assert!(matches!(outcome, Outcome::Dropped { .. }));
}

#[tokio::test]
async fn test_unrecognized_event_is_ignored() {
    let store = store().await;
    let reconciler = reconciler(store, None);

    let outcome = reconciler
        .process(event("invoice.finalized", json!({ "id": "in_1" })))
        .await
        .expect("reconcile");
    assert!(matches!(outcome, Outcome::Ignored { .. }));
}

// ----------------------------------------------------------------------
// Failure semantics
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_failure_after_payment_is_clamped() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let reconciler = reconciler(store.clone(), None);

    reconciler
        .process(session_completed(json!({
            "id": "cs_1",
            "client_reference_id": order_id
        })))
        .await
        .expect("paid");

    let outcome = reconciler
        .process(event(
            "payment_intent.payment_failed",
            json!({ "id": "pi_1", "metadata": { "order_id": order_id } }),
        ))
        .await
        .expect("reconcile");

    assert!(matches!(outcome, Outcome::FailureClamped { .. }));
    let order = store
        .get_order(&order_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(order.status(), OrderStatus::Paid, "paid is sticky");
}

#[tokio::test]
async fn test_async_failure_then_late_success() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    store
        .attach_order_checkout(&order_id, "cs_1", Some("pi_1"))
        .await
        .expect("attach checkout");
    let reconciler = reconciler(store.clone(), None);

    let failed = reconciler
        .process(event(
            "checkout.session.async_payment_failed",
            json!({ "id": "cs_1", "payment_intent": "pi_1" }),
        ))
        .await
        .expect("reconcile");
    assert!(matches!(failed, Outcome::Failed { .. }));

    let late = reconciler
        .process(event(
            "checkout.session.async_payment_succeeded",
            json!({ "id": "cs_1", "payment_intent": "pi_1" }),
        ))
        .await
        .expect("reconcile");
    assert!(matches!(late, Outcome::Paid { .. }));
}

// ----------------------------------------------------------------------
// Provider enrichment
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_contact_enrichment_from_intent() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let provider = FakeProvider::default().with_intent(
        "pi_1",
        json!({
            "id": "pi_1",
            "receipt_email": "receipt@example.com",
            "latest_charge": { "id": "ch_1", "billing_details": { "name": "B. Rechnung" } }
        }),
    );
    let reconciler = reconciler(store.clone(), Some(provider));

    // Session without any contact data forces the intent lookup.
    reconciler
        .process(session_completed(json!({
            "id": "cs_1",
            "client_reference_id": order_id,
            "payment_intent": "pi_1"
        })))
        .await
        .expect("reconcile");

    let order = store
        .get_order(&order_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(order.email, "receipt@example.com");
    assert_eq!(order.name.as_deref(), Some("B. Rechnung"));
}

#[tokio::test]
async fn test_paypal_payer_contact_from_charge_lookup() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let provider = FakeProvider::default()
        .with_intent("pi_1", json!({ "id": "pi_1" }))
        .with_charge(
            "pi_1",
            json!({
                "id": "py_1",
                "payment_intent": "pi_1",
                "payment_method_details": {
                    "paypal": {
                        "payer_email": "payer@example.com",
                        "payer_name": { "given_name": "Max", "surname": "Muster" }
                    }
                }
            }),
        );
    let reconciler = reconciler(store.clone(), Some(provider));

    reconciler
        .process(session_completed(json!({
            "id": "cs_1",
            "client_reference_id": order_id,
            "payment_intent": "pi_1"
        })))
        .await
        .expect("reconcile");

    let order = store
        .get_order(&order_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(order.email, "payer@example.com");
    assert_eq!(order.name.as_deref(), Some("Max Muster"));
}

#[tokio::test]
async fn test_provider_outage_degrades_gracefully() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let reconciler = reconciler(store.clone(), Some(FakeProvider::failing()));

    let outcome = reconciler
        .process(session_completed(json!({
            "id": "cs_1",
            "client_reference_id": order_id,
            "payment_intent": "pi_1"
        })))
        .await
        .expect("enrichment failure must not block the transition");

    assert!(matches!(outcome, Outcome::Paid { .. }));
    let order = store
        .get_order(&order_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(order.status(), OrderStatus::Paid);
    assert_eq!(order.email, "intake@example.com", "intake email kept");
}

#[tokio::test]
async fn test_charge_resolved_via_parent_intent_metadata() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let provider = FakeProvider::default().with_intent(
        "pi_1",
        json!({ "id": "pi_1", "metadata": { "order_id": order_id } }),
    );
    let reconciler = reconciler(store.clone(), Some(provider));

    let outcome = reconciler
        .process(event(
            "charge.succeeded",
            json!({ "id": "ch_1", "payment_intent": "pi_1" }),
        ))
        .await
        .expect("reconcile");

    assert!(matches!(outcome, Outcome::Paid { .. }));
}

// ----------------------------------------------------------------------
// Automation forwarding
// ----------------------------------------------------------------------

#[tokio::test]
async fn test_forwarder_notified_exactly_once() {
    let store = store().await;
    let order_id = seed_order(&store, "intake@example.com").await;
    let forwarder = Arc::new(RecordingForwarder::default());
    let reconciler = Reconciler::new(store.clone(), None, Some(forwarder.clone()));

    let body = json!({ "id": "cs_1", "client_reference_id": order_id });
    reconciler
        .process(session_completed(body.clone()))
        .await
        .expect("first delivery");
    reconciler
        .process(session_completed(body))
        .await
        .expect("second delivery");

    assert_eq!(
        forwarder.count.load(Ordering::SeqCst),
        1,
        "duplicate deliveries must not re-announce the payment"
    );
}

#[tokio::test]
async fn test_lead_payment_is_not_forwarded() {
    let store = store().await;
    let lead = store.create_lead(NewLead::default()).await.expect("create lead");
    store
        .attach_lead_checkout(&lead.id, Some("basic"), "cs_lead", None)
        .await
        .expect("attach checkout");
    let forwarder = Arc::new(RecordingForwarder::default());
    let reconciler = Reconciler::new(store.clone(), None, Some(forwarder.clone()));

    let outcome = reconciler
        .process(session_completed(json!({ "id": "cs_lead" })))
        .await
        .expect("reconcile");
    assert!(matches!(outcome, Outcome::Paid { .. }));

    assert_eq!(
        forwarder.count.load(Ordering::SeqCst),
        0,
        "funnel payments are not announced downstream"
    );
}
