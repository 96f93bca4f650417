//! `shell-events`: named-event pub/sub for the shell and its hosted modules.
//!
//! Every publish has two sinks:
//! - the bus's own in-memory registry ([`LocalFanOut`]), and
//! - an [`AmbientChannel`] shared with modules that were built and loaded
//!   separately and therefore hold their own `EventBus`.

pub mod ambient;
pub mod bus;
pub mod error;
pub mod registry;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use ambient::{AmbientChannel, AmbientEvent, AmbientHub, AmbientListener, ListenerId, NoopChannel};
pub use bus::{BusId, EventBus, Subscription};
pub use error::PublishError;
pub use registry::{EventBusStats, Handler, LocalFanOut, handler};

#[cfg(target_arch = "wasm32")]
pub use web::WindowChannel;
