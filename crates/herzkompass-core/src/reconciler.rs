// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Payment event reconciliation.
//!
//! Webhook deliveries are at-least-once, unordered and partially redundant:
//! one successful card payment produces `checkout.session.completed`,
//! `payment_intent.succeeded` and `charge.succeeded`, in any order. The
//! reconciler folds whichever subset arrives into a single record state.
//!
//! Three rules make this safe:
//!
//! 1. Every event is resolved to a record through the same precedence:
//!    client reference id, then metadata, then stored provider references.
//! 2. The paid transition is a conditional update. The first event wins,
//!    later ones report [`Outcome::AlreadySettled`].
//! 3. `paid` is sticky. Failure events on a settled record are clamped.
//!
//! Contact data is merge-only: a sparse event never erases what a richer
//! event already wrote.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::automation::{AutomationEvent, AutomationForwarder};
use crate::error::CoreError;
use crate::order::{OrderHandle, PaidUpdate, RecordKind, due_at_from};
use crate::provider::PaymentProvider;
use crate::store::{OrderStore, ReferenceKind};
use crate::webhook::{Charge, CheckoutSession, Expandable, PaymentEvent, PaymentIntent};

/// Result of reconciling one event.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The record transitioned to paid.
    Paid {
        /// The record the event resolved to.
        handle: OrderHandle,
    },
    /// The record was already paid or generated; the event was a no-op.
    AlreadySettled {
        /// The record the event resolved to.
        handle: OrderHandle,
    },
    /// The record was marked failed.
    Failed {
        /// The record the event resolved to.
        handle: OrderHandle,
    },
    /// A failure event arrived after payment was confirmed and was ignored.
    FailureClamped {
        /// The record the event resolved to.
        handle: OrderHandle,
    },
    /// The event could not be matched to any record.
    Dropped {
        /// Why resolution failed, for logs.
        reason: String,
    },
    /// The event type is not one the reconciler acts on.
    Ignored {
        /// The envelope event type.
        event_type: String,
    },
}

/// Contact fields resolved from an event, merge-only.
#[derive(Debug, Default, Clone)]
struct Contact {
    email: Option<String>,
    name: Option<String>,
}

impl Contact {
    fn fill_from_charge(&mut self, charge: &Charge) {
        if self.email.is_none() {
            self.email = charge.email().map(str::to_string);
        }
        if self.name.is_none() {
            self.name = charge.name();
        }
    }

    fn fill_from_intent(&mut self, intent: &PaymentIntent) {
        if self.email.is_none() {
            self.email = intent.receipt_email.clone();
        }
        if let Some(charge) = intent.latest_charge.as_ref().and_then(Expandable::object) {
            self.fill_from_charge(charge);
        }
    }
}

/// Folds payment events into order and lead state.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn OrderStore>,
    provider: Option<Arc<dyn PaymentProvider>>,
    forwarder: Option<Arc<dyn AutomationForwarder>>,
}

impl Reconciler {
    /// Create a reconciler.
    ///
    /// Without a provider, enrichment lookups are skipped and events are
    /// applied with whatever contact data they carry themselves. Without a
    /// forwarder, paid transitions are not announced downstream.
    pub fn new(
        store: Arc<dyn OrderStore>,
        provider: Option<Arc<dyn PaymentProvider>>,
        forwarder: Option<Arc<dyn AutomationForwarder>>,
    ) -> Self {
        Self {
            store,
            provider,
            forwarder,
        }
    }

    /// Reconcile one decoded event.
    ///
    /// Database errors propagate; provider lookups used only for enrichment
    /// degrade to warnings.
    #[instrument(skip(self, event), fields(event_type = event.type_name()))]
    pub async fn process(&self, event: PaymentEvent) -> Result<Outcome, CoreError> {
        match event {
            PaymentEvent::SessionCompleted(session)
            | PaymentEvent::SessionAsyncPaymentSucceeded(session) => {
                self.session_paid(session).await
            }
            PaymentEvent::SessionAsyncPaymentFailed(session) => {
                self.session_failed(session).await
            }
            PaymentEvent::IntentSucceeded(intent) => self.intent_paid(intent).await,
            PaymentEvent::IntentFailed(intent) => self.intent_failed(intent).await,
            PaymentEvent::ChargeSucceeded(charge) => self.charge_paid(charge).await,
            PaymentEvent::Unrecognized { event_type } => {
                info!(%event_type, "ignoring unhandled event type");
                Ok(Outcome::Ignored { event_type })
            }
        }
    }

    async fn session_paid(&self, session: CheckoutSession) -> Result<Outcome, CoreError> {
        // Step 1: Resolve the record the session points at.
        let Some(handle) = self.resolve_session(&session).await? else {
            return Ok(self.drop_unmatched("checkout session", &session.id));
        };

        // Step 2: Collect contact data, asking the provider only when the
        // session itself has no email.
        let mut contact = Contact {
            email: session.email().map(str::to_string),
            name: session.name().map(str::to_string),
        };
        if contact.email.is_none()
            && let Some(intent_id) = session.payment_intent.as_deref()
        {
            self.enrich_from_intent(intent_id, &mut contact).await;
        }

        // Step 3: Apply the paid transition.
        self.apply_paid(
            handle,
            contact,
            Some(session.id.clone()),
            session.payment_intent.clone(),
            "checkout.session",
        )
        .await
    }

    async fn session_failed(&self, session: CheckoutSession) -> Result<Outcome, CoreError> {
        let Some(handle) = self.resolve_session(&session).await? else {
            return Ok(self.drop_unmatched("failed checkout session", &session.id));
        };

        self.apply_failed(
            handle,
            Some(session.id.as_str()),
            session.payment_intent.as_deref(),
        )
        .await
    }

    async fn intent_paid(&self, intent: PaymentIntent) -> Result<Outcome, CoreError> {
        let Some(handle) = self.resolve_intent(&intent).await? else {
            return Ok(self.drop_unmatched("payment intent", &intent.id));
        };

        let mut contact = Contact::default();
        contact.fill_from_intent(&intent);

        // The event's intent object often has no expanded charge. Ask for
        // the charge only if contact data is still missing.
        if contact.email.is_none()
            && let Some(provider) = &self.provider
        {
            match provider.latest_charge_for_intent(&intent.id).await {
                Ok(Some(charge)) => contact.fill_from_charge(&charge),
                Ok(None) => {}
                Err(e) => {
                    warn!(intent_id = %intent.id, error = %e, "charge lookup failed, continuing without contact data");
                }
            }
        }

        self.apply_paid(
            handle,
            contact,
            None,
            Some(intent.id.clone()),
            "payment_intent",
        )
        .await
    }

    async fn intent_failed(&self, intent: PaymentIntent) -> Result<Outcome, CoreError> {
        let Some(handle) = self.resolve_intent(&intent).await? else {
            return Ok(self.drop_unmatched("failed payment intent", &intent.id));
        };

        if let Some(error) = intent.last_payment_error.as_ref().and_then(|e| e.message.as_deref()) {
            info!(intent_id = %intent.id, error, "payment intent failed");
        }

        self.apply_failed(handle, None, Some(intent.id.as_str())).await
    }

    async fn charge_paid(&self, charge: Charge) -> Result<Outcome, CoreError> {
        // Step 1: Resolve via charge metadata, then the parent intent's
        // metadata, then stored intent references.
        let mut parent_intent: Option<PaymentIntent> = None;

        let handle = if let Some(handle) = self.resolve_metadata(&charge.metadata).await? {
            Some(handle)
        } else if let Some(intent_id) = charge.intent_id() {
            let mut found = None;
            if let Some(provider) = &self.provider {
                match provider.retrieve_intent(intent_id).await {
                    Ok(intent) => {
                        found = self.resolve_metadata(&intent.metadata).await?;
                        parent_intent = Some(intent);
                    }
                    Err(e) => {
                        warn!(intent_id, error = %e, "intent lookup failed while resolving charge");
                    }
                }
            }
            match found {
                Some(handle) => Some(handle),
                None => {
                    self.store
                        .find_by_reference(ReferenceKind::Intent, intent_id)
                        .await?
                }
            }
        } else {
            None
        };

        let Some(handle) = handle else {
            return Ok(self.drop_unmatched("charge", &charge.id));
        };

        // Step 2: Contact data from the charge itself, then the parent intent.
        let mut contact = Contact::default();
        contact.fill_from_charge(&charge);
        if let Some(intent) = &parent_intent {
            contact.fill_from_intent(intent);
        }

        let intent_ref = charge.intent_id().map(str::to_string);
        self.apply_paid(handle, contact, None, intent_ref, "charge").await
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    async fn resolve_session(
        &self,
        session: &CheckoutSession,
    ) -> Result<Option<OrderHandle>, CoreError> {
        // client_reference_id outranks metadata, which outranks stored refs.
        if let Some(id) = session.client_reference_id.as_deref()
            && let Some(handle) = self.store.resolve_handle(id).await?
        {
            return Ok(Some(handle));
        }

        if let Some(handle) = self.resolve_metadata(&session.metadata).await? {
            return Ok(Some(handle));
        }

        if let Some(handle) = self
            .store
            .find_by_reference(ReferenceKind::Session, &session.id)
            .await?
        {
            return Ok(Some(handle));
        }

        if let Some(intent_id) = session.payment_intent.as_deref() {
            return self
                .store
                .find_by_reference(ReferenceKind::Intent, intent_id)
                .await;
        }

        Ok(None)
    }

    async fn resolve_intent(
        &self,
        intent: &PaymentIntent,
    ) -> Result<Option<OrderHandle>, CoreError> {
        if let Some(handle) = self.resolve_metadata(&intent.metadata).await? {
            return Ok(Some(handle));
        }
        self.store
            .find_by_reference(ReferenceKind::Intent, &intent.id)
            .await
    }

    async fn resolve_metadata(
        &self,
        metadata: &std::collections::HashMap<String, String>,
    ) -> Result<Option<OrderHandle>, CoreError> {
        for key in ["order_id", "lead_id"] {
            if let Some(id) = metadata.get(key)
                && let Some(handle) = self.store.resolve_handle(id).await?
            {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    async fn apply_paid(
        &self,
        handle: OrderHandle,
        contact: Contact,
        session_ref: Option<String>,
        intent_ref: Option<String>,
        source: &str,
    ) -> Result<Outcome, CoreError> {
        let now = Utc::now();
        let update = PaidUpdate {
            paid_at: now,
            due_at: due_at_from(now),
            email: contact.email.clone(),
            name: contact.name.clone(),
            session_ref: session_ref.clone(),
            intent_ref: intent_ref.clone(),
        };

        let applied = self.store.mark_paid_if_unpaid(&handle, &update).await?;
        if !applied {
            info!(record_id = %handle.id, source, "record already settled, skipping");
            return Ok(Outcome::AlreadySettled { handle });
        }

        info!(record_id = %handle.id, source, "record marked paid");

        // Downstream automation only tracks full orders; lead payments stay
        // inside the funnel.
        if handle.kind == RecordKind::Order
            && let Some(forwarder) = &self.forwarder
        {
            let event = AutomationEvent {
                order_id: handle.id.clone(),
                source: source.to_string(),
                email: contact.email,
                name: contact.name,
                session_ref,
                intent_ref,
            };
            if let Err(e) = forwarder.forward(&event).await {
                warn!(record_id = %handle.id, error = %e, "automation forward failed");
            }
        }

        Ok(Outcome::Paid { handle })
    }

    async fn apply_failed(
        &self,
        handle: OrderHandle,
        session_ref: Option<&str>,
        intent_ref: Option<&str>,
    ) -> Result<Outcome, CoreError> {
        let applied = self
            .store
            .mark_failed_if_unpaid(&handle, session_ref, intent_ref)
            .await?;

        if applied {
            info!(record_id = %handle.id, "record marked failed");
            Ok(Outcome::Failed { handle })
        } else {
            info!(record_id = %handle.id, "failure event after settlement, clamped");
            Ok(Outcome::FailureClamped { handle })
        }
    }

    async fn enrich_from_intent(&self, intent_id: &str, contact: &mut Contact) {
        let Some(provider) = &self.provider else {
            return;
        };

        match provider.retrieve_intent(intent_id).await {
            Ok(intent) => {
                contact.fill_from_intent(&intent);
                if contact.email.is_none() {
                    match provider.latest_charge_for_intent(intent_id).await {
                        Ok(Some(charge)) => contact.fill_from_charge(&charge),
                        Ok(None) => {}
                        Err(e) => {
                            warn!(intent_id, error = %e, "charge lookup failed, continuing without contact data");
                        }
                    }
                }
            }
            Err(e) => {
                warn!(intent_id, error = %e, "intent lookup failed, continuing without contact data");
            }
        }
    }

    fn drop_unmatched(&self, what: &str, reference: &str) -> Outcome {
        let reason = format!("{what} '{reference}' matched no order or lead");
        warn!(reference, "{}", reason);
        Outcome::Dropped { reason }
    }
}
