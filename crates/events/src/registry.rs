//! In-memory subscriber registry (the local sink of a publish).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::error::PublishError;

/// A subscriber callback.
///
/// Handles are compared by identity: registering the same `Handler` twice
/// creates two registrations that a single unsubscribe removes together.
pub type Handler = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure into a shareable [`Handler`].
pub fn handler<F>(callback: F) -> Handler
where
    F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(callback)
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Counters for the local registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBusStats {
    /// Number of deliveries started (one per publish or bridged ambient event).
    pub events_published: usize,
    /// Number of handler invocations.
    pub events_delivered: usize,
    /// Registrations currently held, across all event names.
    pub active_subscriptions: usize,
    /// Registrations ever made.
    pub total_subscriptions: usize,
}

/// One `add` call. The id tells re-registrations of the same handle apart.
#[derive(Clone)]
struct Registration {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    events: HashMap<String, Vec<Registration>>,
    next_id: u64,
    stats: EventBusStats,
}

/// Event-name → ordered handler list.
///
/// The lock is never held while a handler runs, so handlers may subscribe,
/// unsubscribe or publish re-entrantly.
#[derive(Default)]
pub struct LocalFanOut {
    registry: Mutex<Registry>,
}

impl LocalFanOut {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // Handlers never run under the lock, so a poisoned registry is still consistent.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a registration. Duplicates are allowed.
    pub fn add(&self, event: &str, handler: Handler) {
        let mut reg = self.lock();
        reg.next_id += 1;
        let id = reg.next_id;
        reg.events
            .entry(event.to_string())
            .or_default()
            .push(Registration { id, handler });
        reg.stats.total_subscriptions += 1;
    }

    /// Remove every registration of `handler` under `event`.
    ///
    /// Returns how many were removed; unknown events and handlers remove nothing.
    pub fn remove(&self, event: &str, handler: &Handler) -> usize {
        let mut reg = self.lock();
        let Some(list) = reg.events.get_mut(event) else {
            return 0;
        };
        let before = list.len();
        list.retain(|r| !same_handler(&r.handler, handler));
        before - list.len()
    }

    /// Clear one event's list, or every list when `event` is `None`.
    pub fn clear(&self, event: Option<&str>) -> usize {
        let mut reg = self.lock();
        match event {
            Some(name) => reg.events.remove(name).map(|list| list.len()).unwrap_or(0),
            None => {
                let count = reg.events.values().map(Vec::len).sum();
                reg.events.clear();
                count
            }
        }
    }

    fn is_registered(&self, event: &str, id: u64) -> bool {
        self.lock()
            .events
            .get(event)
            .is_some_and(|list| list.iter().any(|r| r.id == id))
    }

    /// Invoke the handlers registered for `event`, in registration order.
    ///
    /// The list is snapshotted when delivery starts: handlers added during
    /// delivery wait for the next publish, handlers removed during delivery
    /// are skipped if not yet reached (even if the same handle was registered
    /// again in the meantime). Returns the number of invocations.
    pub fn deliver(&self, event: &str, payload: &Value) -> Result<usize, PublishError> {
        let snapshot = {
            let mut reg = self.lock();
            reg.stats.events_published += 1;
            reg.events.get(event).cloned().unwrap_or_default()
        };

        let mut delivered = 0;
        for Registration { id, handler } in &snapshot {
            if !self.is_registered(event, *id) {
                continue;
            }
            self.lock().stats.events_delivered += 1;
            delivered += 1;

            handler(payload).map_err(|error| PublishError::Subscriber {
                event: event.to_string(),
                error,
            })?;
        }
        Ok(delivered)
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.lock().events.get(event).map(Vec::len).unwrap_or(0)
    }

    /// Names that currently have at least one subscriber, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .events
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> EventBusStats {
        let reg = self.lock();
        EventBusStats {
            active_subscriptions: reg.events.values().map(Vec::len).sum(),
            ..reg.stats.clone()
        }
    }
}

impl core::fmt::Debug for LocalFanOut {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalFanOut")
            .field("events", &self.event_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Handler {
        let log = log.clone();
        handler(move |_| {
            log.lock().unwrap().push(tag.to_string());
            Ok(())
        })
    }

    #[test]
    fn duplicate_registrations_fire_twice_and_remove_together() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let fan_out = LocalFanOut::new();
        let h = recorder(&log, "a");

        fan_out.add("ping", h.clone());
        fan_out.add("ping", h.clone());
        assert_eq!(fan_out.deliver("ping", &json!(null)).unwrap(), 2);

        assert_eq!(fan_out.remove("ping", &h), 2);
        assert_eq!(fan_out.deliver("ping", &json!(null)).unwrap(), 0);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn equal_closures_are_distinct_handlers() {
        let fan_out = LocalFanOut::new();
        let a = handler(|_| Ok(()));
        let b = handler(|_| Ok(()));
        fan_out.add("x", a.clone());
        fan_out.add("x", b);

        assert_eq!(fan_out.remove("x", &a), 1);
        assert_eq!(fan_out.subscriber_count("x"), 1);
    }

    #[test]
    fn handle_reregistered_mid_delivery_waits_for_next_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let fan_out = Arc::new(LocalFanOut::new());
        let second = recorder(&log, "second");

        let inner = fan_out.clone();
        let moved = second.clone();
        let armed = std::sync::atomic::AtomicBool::new(true);
        fan_out.add(
            "e",
            handler(move |_| {
                if armed.swap(false, std::sync::atomic::Ordering::SeqCst) {
                    inner.remove("e", &moved);
                    inner.add("e", moved.clone());
                }
                Ok(())
            }),
        );
        fan_out.add("e", second);

        assert_eq!(fan_out.deliver("e", &json!(1)).unwrap(), 1);
        assert!(log.lock().unwrap().is_empty());

        assert_eq!(fan_out.deliver("e", &json!(2)).unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["second".to_string()]);
    }

    #[test]
    fn clear_single_and_all() {
        let fan_out = LocalFanOut::new();
        fan_out.add("a", handler(|_| Ok(())));
        fan_out.add("b", handler(|_| Ok(())));
        fan_out.add("b", handler(|_| Ok(())));

        assert_eq!(fan_out.clear(Some("b")), 2);
        assert_eq!(fan_out.event_names(), vec!["a".to_string()]);
        assert_eq!(fan_out.clear(None), 1);
        assert!(fan_out.event_names().is_empty());
    }

    #[test]
    fn stats_track_deliveries() {
        let fan_out = LocalFanOut::new();
        fan_out.add("a", handler(|_| Ok(())));
        fan_out.add("a", handler(|_| Ok(())));
        fan_out.deliver("a", &json!(1)).unwrap();
        fan_out.deliver("missing", &json!(1)).unwrap();

        let stats = fan_out.stats();
        assert_eq!(stats.events_published, 2);
        assert_eq!(stats.events_delivered, 2);
        assert_eq!(stats.active_subscriptions, 2);
        assert_eq!(stats.total_subscriptions, 2);
    }
}
