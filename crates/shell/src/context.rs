//! Shell context: the objects built once at startup and shared with hosted
//! modules.

use std::sync::Arc;

use serde::Serialize;

use shell_auth::{AuthSession, SessionResult};
use shell_core::{KeyValueStore, MemoryStore};
use shell_events::{AmbientChannel, EventBus, NoopChannel};

use crate::config::ShellConfig;
use crate::menu::MenuRegistry;
use crate::router::{Navigation, NavigationDecision, NavigationGuard, Route, RouteTable};

/// What hosted modules see when they look the shell up by its config `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellInfo {
    pub name: String,
    pub version: String,
}

/// Result of running a navigation through the guard and route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationOutcome {
    pub decision: NavigationDecision,
    /// Where the user ends up (the requested path, or the redirect target).
    pub path: String,
    /// Route matched for `path`, if any.
    pub route: Option<Route>,
}

#[derive(Debug, Clone)]
pub struct ShellContext {
    config: ShellConfig,
    bus: EventBus,
    session: Arc<AuthSession>,
    guard: NavigationGuard,
    routes: RouteTable,
    menu: Arc<MenuRegistry>,
}

impl ShellContext {
    /// Wire the bus, session, guard, routes and menu together.
    pub fn init(
        config: ShellConfig,
        store: Arc<dyn KeyValueStore>,
        ambient: Arc<dyn AmbientChannel>,
    ) -> Self {
        let bus = EventBus::new(ambient);
        let session = Arc::new(
            AuthSession::new(bus.clone(), store).with_storage_key(config.storage_key.clone()),
        );
        let guard = NavigationGuard::new(session.clone(), &config.login_path);
        let routes = RouteTable::from_config(&config);

        tracing::info!(
            shell = %config.name,
            version = %config.version,
            bus = %bus.id(),
            routes = routes.routes().len(),
            "shell context initialized"
        );

        Self {
            config,
            bus,
            session,
            guard,
            routes,
            menu: Arc::new(MenuRegistry::new()),
        }
    }

    /// In-memory storage and no ambient broadcast.
    pub fn in_memory(config: ShellConfig) -> Self {
        Self::init(config, Arc::new(MemoryStore::new()), Arc::new(NoopChannel))
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn menu(&self) -> &Arc<MenuRegistry> {
        &self.menu
    }

    pub fn info(&self) -> ShellInfo {
        ShellInfo {
            name: self.config.display_name.clone(),
            version: self.config.version.clone(),
        }
    }

    pub fn navigate(&self, navigation: &Navigation) -> SessionResult<NavigationOutcome> {
        let decision = self.guard.before_each(navigation)?;
        let path = match &decision {
            NavigationDecision::Proceed => navigation.to().to_string(),
            NavigationDecision::Redirect(to) => to.clone(),
        };
        let route = self.routes.resolve(&path).cloned();
        if route.is_none() {
            tracing::debug!(path = %path, "no route matches");
        }
        Ok(NavigationOutcome {
            decision,
            path,
            route,
        })
    }
}
