//! Webhook dispatch.
//!
//! Handler resolution per event:
//! 1. postbacks and quick-reply messages whose payload has a registered callback
//!    go to that callback only;
//! 2. otherwise the per-call override for the event's category;
//! 3. otherwise the persistent handler for the category;
//! 4. otherwise the event is dropped.

use std::{fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{
    callbacks::{CallbackRegistry, PayloadKind},
    event::{Event, EventCategory, EventKind, WebhookBody},
    Result,
};

/// Persistent per-category handler.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// One slot per category; setting a slot replaces what was there.
#[derive(Clone, Default)]
pub struct HandlerSlots {
    slots: [Option<EventHandler>; EventCategory::ALL.len()],
}

impl HandlerSlots {
    pub fn set(&mut self, category: EventCategory, handler: EventHandler) {
        self.slots[category.index()] = Some(handler);
    }

    pub fn get(&self, category: EventCategory) -> Option<&EventHandler> {
        self.slots[category.index()].as_ref()
    }

    pub fn clear(&mut self, category: EventCategory) {
        self.slots[category.index()] = None;
    }
}

impl fmt::Debug for HandlerSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<_> = EventCategory::ALL
            .iter()
            .filter(|c| self.get(**c).is_some())
            .map(|c| c.as_str())
            .collect();
        f.debug_struct("HandlerSlots").field("set", &set).finish()
    }
}

/// One-shot handlers for a single `handle_webhook` call.
///
/// They take precedence over the persistent handlers for that call only and may
/// borrow local state.
#[derive(Default)]
pub struct Overrides<'a> {
    slots: [Option<&'a (dyn Fn(&Event) + 'a)>; EventCategory::ALL.len()],
}

impl<'a> Overrides<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: EventCategory, handler: &'a (dyn Fn(&Event) + 'a)) -> Self {
        self.slots[category.index()] = Some(handler);
        self
    }

    pub fn message(self, handler: &'a (dyn Fn(&Event) + 'a)) -> Self {
        self.with(EventCategory::Message, handler)
    }

    pub fn echo(self, handler: &'a (dyn Fn(&Event) + 'a)) -> Self {
        self.with(EventCategory::Echo, handler)
    }

    pub fn postback(self, handler: &'a (dyn Fn(&Event) + 'a)) -> Self {
        self.with(EventCategory::Postback, handler)
    }

    pub fn delivery(self, handler: &'a (dyn Fn(&Event) + 'a)) -> Self {
        self.with(EventCategory::Delivery, handler)
    }

    pub fn read(self, handler: &'a (dyn Fn(&Event) + 'a)) -> Self {
        self.with(EventCategory::Read, handler)
    }

    pub fn account_linking(self, handler: &'a (dyn Fn(&Event) + 'a)) -> Self {
        self.with(EventCategory::AccountLinking, handler)
    }

    pub fn get(&self, category: EventCategory) -> Option<&'a (dyn Fn(&Event) + 'a)> {
        self.slots[category.index()]
    }
}

#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    handlers: HandlerSlots,
    callbacks: CallbackRegistry,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the persistent handler for `category`, replacing any previous one.
    pub fn register<F>(&mut self, category: EventCategory, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers.set(category, Arc::new(handler));
    }

    /// Bind a payload callback to each literal in `payloads`.
    pub fn register_callback<I, S, F>(&mut self, kind: PayloadKind, payloads: I, callback: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &Event) + Send + Sync + 'static,
    {
        self.callbacks.register(kind, payloads, Arc::new(callback));
    }

    pub fn handlers(&self) -> &HandlerSlots {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerSlots {
        &mut self.handlers
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Parse and route one webhook body.
    ///
    /// Returns `Ok(false)` without invoking anything when the body is not a page
    /// webhook, whatever the rest of it looks like. Malformed JSON is an error;
    /// malformed entries and events are skipped.
    pub fn handle_webhook(&self, body: &str, overrides: &Overrides<'_>) -> Result<bool> {
        let body = WebhookBody::parse(body)?;
        if !body.is_page() {
            debug!(object = ?body.object, "ignoring non-page webhook");
            return Ok(false);
        }

        let mut routed = 0usize;
        let mut skipped = 0usize;
        for entry in body.entries() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping malformed entry");
                    skipped += 1;
                    continue;
                }
            };
            for raw in &entry.messaging {
                match Event::parse(raw) {
                    Ok(Some(event)) => {
                        self.dispatch(&event, overrides);
                        routed += 1;
                    }
                    Ok(None) => {
                        debug!(entry = %entry.id, "skipping messaging event with no known variant");
                        skipped += 1;
                    }
                    Err(e) => {
                        debug!(entry = %entry.id, error = %e, "skipping malformed messaging event");
                        skipped += 1;
                    }
                }
            }
        }

        trace!(routed, skipped, "webhook dispatched");
        Ok(true)
    }

    /// Route one already-classified event.
    pub fn dispatch(&self, event: &Event, overrides: &Overrides<'_>) {
        let category = event.category();

        if let Some((kind, payload)) = payload_route(event) {
            if let Some(callback) = self.callbacks.resolve(kind, payload) {
                trace!(category = category.as_str(), payload, "payload callback");
                callback(payload, event);
                return;
            }
        }

        if let Some(handler) = overrides.get(category) {
            trace!(category = category.as_str(), "override handler");
            handler(event);
        } else if let Some(handler) = self.handlers.get(category) {
            trace!(category = category.as_str(), "registered handler");
            handler(event);
        } else {
            trace!(category = category.as_str(), "no handler; dropped");
        }
    }
}

fn payload_route(event: &Event) -> Option<(PayloadKind, &str)> {
    match &event.kind {
        EventKind::Postback(p) => Some((PayloadKind::Postback, p.payload.as_str())),
        EventKind::Message(m) => m
            .quick_reply
            .as_ref()
            .map(|q| (PayloadKind::QuickReply, q.payload.as_str())),
        _ => None,
    }
}
