//! `dashboard-shell`: host application wiring.
//!
//! Builds the [`ShellContext`] (bus, session, navigation guard, routes, menu)
//! once at startup and hands it to whoever needs it.

pub mod config;
pub mod context;
pub mod menu;
pub mod router;

pub use config::{ConfigError, RemoteModule, ShellConfig};
pub use context::{NavigationOutcome, ShellContext, ShellInfo};
pub use menu::{MenuItem, MenuRegistry};
pub use router::{Navigation, NavigationDecision, NavigationGuard, Route, RouteTable, RouteTarget};
