//! Route table and the pre-navigation auth guard.

use std::sync::Arc;

use serde::Serialize;

use shell_auth::{AuthSession, SessionResult};

use crate::config::ShellConfig;

/// Strip query/fragment and trailing slashes; always returns a leading `/`.
pub fn normalize_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// What a route renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "module", rename_all = "lowercase")]
pub enum RouteTarget {
    /// A view owned by the shell.
    Local,
    /// A remote module, by federation name.
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    name: String,
    path: String,
    catch_all: bool,
    target: RouteTarget,
}

impl Route {
    /// Matches `path` exactly (after normalization).
    pub fn exact(name: impl Into<String>, path: &str) -> Self {
        Self {
            name: name.into(),
            path: normalize_path(path),
            catch_all: false,
            target: RouteTarget::Local,
        }
    }

    /// Matches `prefix` and everything below it.
    pub fn catch_all(name: impl Into<String>, prefix: &str, target: RouteTarget) -> Self {
        Self {
            name: name.into(),
            path: normalize_path(prefix),
            catch_all: true,
            target,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    /// Router-style pattern, e.g. `/admin/:pathMatch(.*)*`.
    pub fn pattern(&self) -> String {
        if self.catch_all {
            format!("{}/:pathMatch(.*)*", self.path.trim_end_matches('/'))
        } else {
            self.path.clone()
        }
    }

    /// `path` must already be normalized.
    fn matches(&self, path: &str) -> bool {
        if !self.catch_all {
            return self.path == path;
        }
        if self.path == "/" {
            return true;
        }
        path == self.path
            || path
                .strip_prefix(self.path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Ordered route list; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// `home` at `/`, `login` at the configured login path, and one mount
    /// point per remote module.
    pub fn from_config(config: &ShellConfig) -> Self {
        let mut routes = vec![
            Route::exact("home", "/"),
            Route::exact("login", &config.login_path),
        ];
        routes.extend(config.remotes.iter().map(|remote| {
            Route::catch_all(
                remote.route_name.clone(),
                &remote.mount_path,
                RouteTarget::Remote(remote.name.clone()),
            )
        }));
        Self { routes }
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let path = normalize_path(path);
        self.routes.iter().find(|route| route.matches(&path))
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// A navigation request from the routing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    to: String,
    from: Option<String>,
}

impl Navigation {
    /// The first navigation after startup (there is no previous route).
    pub fn initial(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: None,
        }
    }

    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: Some(from.into()),
        }
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn previous(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn is_first(&self) -> bool {
        self.from.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "lowercase")]
pub enum NavigationDecision {
    Proceed,
    Redirect(String),
}

/// Runs before every navigation.
///
/// On the first navigation it restores a remembered session. The login page
/// is always reachable; every other page requires an authenticated session.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    session: Arc<AuthSession>,
    login_path: String,
}

impl NavigationGuard {
    pub fn new(session: Arc<AuthSession>, login_path: &str) -> Self {
        Self {
            session,
            login_path: normalize_path(login_path),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn before_each(&self, navigation: &Navigation) -> SessionResult<NavigationDecision> {
        if navigation.is_first() {
            let restored = self.session.check_saved_auth()?;
            tracing::debug!(restored, "checked saved session on first navigation");
        }

        if normalize_path(navigation.to()) == self.login_path {
            return Ok(NavigationDecision::Proceed);
        }

        if self.session.is_authenticated() {
            Ok(NavigationDecision::Proceed)
        } else {
            tracing::debug!(to = navigation.to(), "not authenticated; redirecting to login");
            Ok(NavigationDecision::Redirect(self.login_path.clone()))
        }
    }
}
