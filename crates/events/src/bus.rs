//! Named-event publish/subscribe bus.
//!
//! This module provides the **event bus pattern** used between the shell and
//! the micro-frontend modules it hosts.
//!
//! ## Delivery
//!
//! A publish is delivered in two explicit steps:
//!
//! ```text
//! publish(name, payload)
//!     ├─ 1. LocalFanOut   (handlers registered on *this* bus, in order)
//!     └─ 2. AmbientChannel (host-global, reaches buses in other modules)
//! ```
//!
//! Modules that are built and deployed separately do not share a registry, so
//! the ambient step is how they observe each other. A bus can opt in to events
//! broadcast by *other* buses with [`EventBus::listen_ambient`].
//!
//! ## Ordering & re-entrancy
//!
//! - Handlers run synchronously, in registration order.
//! - The handler list is snapshotted when the publish starts; a handler
//!   unsubscribed before it is reached is skipped, the running handler is
//!   never interrupted.
//! - Handlers may publish; the nested publish completes before the outer one
//!   moves on to its next handler.
//!
//! ## Errors
//!
//! Handlers are not isolated. The first error is returned to the publisher as
//! [`PublishError::Subscriber`]; remaining handlers and the ambient broadcast
//! for that publish are skipped. Publishing an event nobody listens to is not
//! an error.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ambient::{AmbientChannel, AmbientEvent, AmbientListener, ListenerId, NoopChannel};
use crate::error::PublishError;
use crate::registry::{EventBusStats, Handler, LocalFanOut};

/// Identity of one bus instance (one per independently loaded module).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(Uuid);

impl BusId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BusId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for BusId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Capability returned by [`EventBus::subscribe`].
///
/// Dropping it does **not** unsubscribe. `unsubscribe` removes every
/// registration of this exact handler under this event name and is
/// idempotent.
#[derive(Clone)]
pub struct Subscription {
    event: String,
    handler: Handler,
    local: Weak<LocalFanOut>,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn unsubscribe(&self) {
        let Some(local) = self.local.upgrade() else {
            return;
        };
        let removed = local.remove(&self.event, &self.handler);
        tracing::trace!(event = %self.event, removed, "unsubscribed");
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Cheaply cloneable handle to a bus; clones share one registry.
#[derive(Clone)]
pub struct EventBus {
    id: BusId,
    local: Arc<LocalFanOut>,
    ambient: Arc<dyn AmbientChannel>,
}

impl EventBus {
    pub fn new(ambient: Arc<dyn AmbientChannel>) -> Self {
        Self {
            id: BusId::new(),
            local: Arc::new(LocalFanOut::new()),
            ambient,
        }
    }

    /// A bus with no ambient channel (everything stays local).
    pub fn detached() -> Self {
        Self::new(Arc::new(NoopChannel))
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn ambient(&self) -> &Arc<dyn AmbientChannel> {
        &self.ambient
    }

    pub fn local(&self) -> &LocalFanOut {
        &self.local
    }

    /// Register `callback` for `event`.
    pub fn subscribe<F>(&self, event: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_handler(event, Arc::new(callback))
    }

    /// Register an existing handle. The same handle may be registered more
    /// than once; each registration is invoked.
    pub fn subscribe_handler(&self, event: impl Into<String>, handler: Handler) -> Subscription {
        let event = event.into();
        self.local.add(&event, handler.clone());
        tracing::trace!(bus = %self.id, event = %event, "new subscription");

        Subscription {
            event,
            handler,
            local: Arc::downgrade(&self.local),
        }
    }

    /// Deliver to local subscribers, then broadcast on the ambient channel.
    pub fn publish(&self, event: &str, payload: Value) -> Result<(), PublishError> {
        let delivered = self.local.deliver(event, &payload)?;
        tracing::trace!(bus = %self.id, event, delivered, "published");

        self.ambient
            .dispatch(&AmbientEvent::from_bus(self.id, event, payload));
        Ok(())
    }

    /// [`publish`](Self::publish) with a serializable payload.
    pub fn publish_json<T>(&self, event: &str, payload: &T) -> Result<(), PublishError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(payload).map_err(|error| PublishError::Encode {
            event: event.to_string(),
            error,
        })?;
        self.publish(event, value)
    }

    /// Clear one event's subscribers, or all of them when `event` is `None`.
    pub fn unsubscribe_all(&self, event: Option<&str>) {
        let count = self.local.clear(event);
        match event {
            Some(name) => tracing::debug!(bus = %self.id, event = name, count, "cleared subscribers"),
            None => tracing::info!(bus = %self.id, count, "cleared all subscribers"),
        }
    }

    /// Deliver `event` broadcasts from other buses to this bus's subscribers.
    ///
    /// Broadcasts originating from this bus are ignored (they were already
    /// delivered locally). Subscriber errors are logged: the ambient channel
    /// has nobody to report them to.
    pub fn listen_ambient(&self, event: &str) -> ListenerId {
        let own_id = self.id;
        let local = Arc::downgrade(&self.local);

        let listener: AmbientListener = Arc::new(move |ev: &AmbientEvent| {
            if ev.origin == Some(own_id) {
                return;
            }
            let Some(local) = local.upgrade() else {
                return;
            };
            if let Err(err) = local.deliver(&ev.name, &ev.detail) {
                tracing::warn!(bus = %own_id, event = %ev.name, "ambient delivery failed: {err}");
            }
        });

        self.ambient.add_listener(event, listener)
    }

    pub fn stop_listening(&self, id: ListenerId) -> bool {
        self.ambient.remove_listener(id)
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.local.subscriber_count(event)
    }

    pub fn event_names(&self) -> Vec<String> {
        self.local.event_names()
    }

    pub fn stats(&self) -> EventBusStats {
        self.local.stats()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::detached()
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("id", &self.id)
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}
