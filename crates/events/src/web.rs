//! `window` as the ambient channel (wasm32 only).
//!
//! Broadcasts become DOM `CustomEvent`s whose `detail` is the JSON payload, so
//! plain JavaScript modules can listen with `window.addEventListener`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

use crate::ambient::{AmbientChannel, AmbientEvent, AmbientListener, ListenerId};
use crate::bus::BusId;

type DomCallback = Closure<dyn FnMut(web_sys::Event)>;

thread_local! {
    // JS closures are not Send; the browser main thread owns them.
    static LISTENERS: RefCell<HashMap<ListenerId, (String, DomCallback)>> = RefCell::new(HashMap::new());
    // DOM dispatch is synchronous, so the bus currently dispatching is known to listeners.
    static DISPATCHING: Cell<Option<BusId>> = const { Cell::new(None) };
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WindowChannel;

impl WindowChannel {
    pub fn new() -> Self {
        Self
    }
}

impl AmbientChannel for WindowChannel {
    fn dispatch(&self, event: &AmbientEvent) {
        let Some(window) = web_sys::window() else {
            return;
        };

        let detail = match event
            .detail
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        {
            Ok(detail) => detail,
            Err(err) => {
                tracing::warn!(event = %event.name, "failed to convert payload for window: {err}");
                return;
            }
        };

        let init = web_sys::CustomEventInit::new();
        init.set_detail(&detail);
        let custom = match web_sys::CustomEvent::new_with_event_init_dict(&event.name, &init) {
            Ok(custom) => custom,
            Err(err) => {
                tracing::warn!(event = %event.name, "failed to create CustomEvent: {err:?}");
                return;
            }
        };

        let previous = DISPATCHING.with(|d| d.replace(event.origin));
        if let Err(err) = window.dispatch_event(&custom) {
            tracing::warn!(event = %event.name, "failed to dispatch CustomEvent: {err:?}");
        }
        DISPATCHING.with(|d| d.set(previous));
    }

    fn add_listener(&self, name: &str, listener: AmbientListener) -> ListenerId {
        let id = ListenerId::next();
        let Some(window) = web_sys::window() else {
            return id;
        };

        let event_name = name.to_string();
        let callback: DomCallback = Closure::new(move |ev: web_sys::Event| {
            let detail = ev
                .dyn_ref::<web_sys::CustomEvent>()
                .and_then(|custom| serde_wasm_bindgen::from_value::<Value>(custom.detail()).ok())
                .unwrap_or(Value::Null);
            let origin = DISPATCHING.with(|d| d.get());
            listener(&AmbientEvent {
                name: event_name.clone(),
                detail,
                origin,
            });
        });

        if let Err(err) =
            window.add_event_listener_with_callback(name, callback.as_ref().unchecked_ref())
        {
            tracing::warn!(event = name, "failed to add window listener: {err:?}");
            return id;
        }

        LISTENERS.with(|l| l.borrow_mut().insert(id, (name.to_string(), callback)));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let Some((name, callback)) = LISTENERS.with(|l| l.borrow_mut().remove(&id)) else {
            return false;
        };
        if let Some(window) = web_sys::window() {
            let _ = window
                .remove_event_listener_with_callback(&name, callback.as_ref().unchecked_ref());
        }
        true
    }
}
