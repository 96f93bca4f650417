//! Ambient, host-global event channel (the cross-module sink of a publish).
//!
//! In a browser this is `window.dispatchEvent(new CustomEvent(name, { detail }))`.
//! Off-browser, [`AmbientHub`] plays the same role for every bus in the process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bus::BusId;

/// An event as seen on the ambient channel.
///
/// `detail` carries the publish payload unchanged; `origin` names the bus that
/// broadcast it when the channel can tell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientEvent {
    pub name: String,
    pub detail: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<BusId>,
}

impl AmbientEvent {
    pub fn new(name: impl Into<String>, detail: Value) -> Self {
        Self {
            name: name.into(),
            detail,
            origin: None,
        }
    }

    pub fn from_bus(origin: BusId, name: impl Into<String>, detail: Value) -> Self {
        Self {
            origin: Some(origin),
            ..Self::new(name, detail)
        }
    }
}

/// Listener registered on an ambient channel.
pub type AmbientListener = Arc<dyn Fn(&AmbientEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Host-provided broadcast mechanism.
///
/// Fire-and-forget: `dispatch` reports nothing back, and a misbehaving
/// listener never affects the dispatcher.
pub trait AmbientChannel: Send + Sync {
    fn dispatch(&self, event: &AmbientEvent);

    fn add_listener(&self, name: &str, listener: AmbientListener) -> ListenerId;

    /// Returns false if the id was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

impl<C> AmbientChannel for Arc<C>
where
    C: AmbientChannel + ?Sized,
{
    fn dispatch(&self, event: &AmbientEvent) {
        (**self).dispatch(event)
    }

    fn add_listener(&self, name: &str, listener: AmbientListener) -> ListenerId {
        (**self).add_listener(name, listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        (**self).remove_listener(id)
    }
}

/// Channel that drops everything (standalone bus, no host).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChannel;

impl AmbientChannel for NoopChannel {
    fn dispatch(&self, _event: &AmbientEvent) {}

    fn add_listener(&self, _name: &str, _listener: AmbientListener) -> ListenerId {
        ListenerId::next()
    }

    fn remove_listener(&self, _id: ListenerId) -> bool {
        false
    }
}

struct Registered {
    id: ListenerId,
    name: String,
    listener: AmbientListener,
}

/// In-process ambient channel.
///
/// Dispatch is synchronous and re-entrant: listeners run after the lock is
/// released, in registration order.
#[derive(Default)]
pub struct AmbientHub {
    listeners: Mutex<Vec<Registered>>,
}

impl AmbientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide hub, standing in for the browser `window`.
    pub fn global() -> Arc<AmbientHub> {
        static GLOBAL: OnceLock<Arc<AmbientHub>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(AmbientHub::new())).clone()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.name == name)
            .count()
    }
}

impl AmbientChannel for AmbientHub {
    fn dispatch(&self, event: &AmbientEvent) {
        let targets: Vec<AmbientListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.name == event.name)
            .map(|r| r.listener.clone())
            .collect();

        tracing::trace!(event = %event.name, listeners = targets.len(), "ambient dispatch");
        for listener in targets {
            listener(event);
        }
    }

    fn add_listener(&self, name: &str, listener: AmbientListener) -> ListenerId {
        let id = ListenerId::next();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registered {
                id,
                name: name.to_string(),
                listener,
            });
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|r| r.id != id);
        listeners.len() != before
    }
}

impl core::fmt::Debug for AmbientHub {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let count = self
            .listeners
            .lock()
            .map(|l| l.len())
            .unwrap_or_default();
        f.debug_struct("AmbientHub").field("listeners", &count).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatch_reaches_only_matching_names() {
        let hub = AmbientHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        hub.add_listener(
            "authChanged",
            Arc::new(move |ev: &AmbientEvent| sink.lock().unwrap().push(ev.detail.clone())),
        );

        hub.dispatch(&AmbientEvent::new("authChanged", json!(true)));
        hub.dispatch(&AmbientEvent::new("other", json!(1)));

        assert_eq!(*seen.lock().unwrap(), vec![json!(true)]);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let hub = AmbientHub::new();
        let calls = Arc::new(AtomicU64::new(0));

        let counter = calls.clone();
        let id = hub.add_listener(
            "e",
            Arc::new(move |_: &AmbientEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(hub.remove_listener(id));
        assert!(!hub.remove_listener(id));

        hub.dispatch(&AmbientEvent::new("e", Value::Null));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(hub.listener_count("e"), 0);
    }

    #[test]
    fn ambient_event_serializes_like_custom_event_detail() {
        let ev = AmbientEvent::new("userLoggedIn", json!({ "username": "alice" }));
        let encoded = serde_json::to_value(&ev).unwrap();
        assert_eq!(
            encoded,
            json!({ "name": "userLoggedIn", "detail": { "username": "alice" } })
        );
    }
}
