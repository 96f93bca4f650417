//! Shell configuration, read from the environment.

use std::path::PathBuf;

use thiserror::Error;

use shell_auth::AUTH_STORAGE_KEY;
use shell_observability::LogFormat;

pub const DEFAULT_ADMIN_MFE_URL: &str = "http://localhost:4173/assets/remoteEntry.js";

/// A separately deployed module mounted under a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModule {
    /// Federation name of the module (e.g. `adminMFE`).
    pub name: String,
    /// Route name used for the mount point.
    pub route_name: String,
    /// Every path under this prefix is handed to the module.
    pub mount_path: String,
    /// URL of the module's remote entry script.
    pub entry_url: String,
}

impl RemoteModule {
    pub fn admin(entry_url: impl Into<String>) -> Self {
        Self {
            name: "adminMFE".to_string(),
            route_name: "admin".to_string(),
            mount_path: "/admin".to_string(),
            entry_url: entry_url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Identifier hosted modules use to find the shell.
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub login_path: String,
    pub storage_key: String,
    /// Where the native file store lives; `None` means the OS data dir.
    pub storage_path: Option<PathBuf>,
    pub log_format: LogFormat,
    pub remotes: Vec<RemoteModule>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("login path must start with '/': {0:?}")]
    InvalidLoginPath(String),

    #[error("remote module '{0}' has an empty entry url")]
    EmptyRemoteUrl(String),

    #[error("storage key must not be empty")]
    EmptyStorageKey,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: "dashboardShell".to_string(),
            display_name: "Dashboard Shell".to_string(),
            version: "1.0.0".to_string(),
            login_path: "/login".to_string(),
            storage_key: AUTH_STORAGE_KEY.to_string(),
            storage_path: None,
            log_format: LogFormat::Text,
            remotes: vec![RemoteModule::admin(DEFAULT_ADMIN_MFE_URL)],
        }
    }
}

impl ShellConfig {
    /// Read `SHELL_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("SHELL_NAME") {
            config.name = name;
        }
        if let Some(path) = lookup("SHELL_LOGIN_PATH") {
            config.login_path = path;
        }
        if let Some(key) = lookup("SHELL_STORAGE_KEY") {
            config.storage_key = key;
        }
        if let Some(path) = lookup("SHELL_STORAGE_PATH") {
            config.storage_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("SHELL_ADMIN_MFE_URL") {
            config.remotes = vec![RemoteModule::admin(url)];
        }
        if let Some(raw) = lookup("SHELL_LOG_FORMAT") {
            config.log_format = raw.parse().unwrap_or_else(|err| {
                tracing::warn!("{err}; falling back to text logs");
                LogFormat::Text
            });
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::InvalidLoginPath(self.login_path.clone()));
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }
        if let Some(remote) = self.remotes.iter().find(|r| r.entry_url.trim().is_empty()) {
            return Err(ConfigError::EmptyRemoteUrl(remote.name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_match_stock_shell() {
        let config = ShellConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.storage_key, "auth");
        assert_eq!(config.remotes[0].entry_url, DEFAULT_ADMIN_MFE_URL);
    }

    #[test]
    fn overrides_apply() {
        let config = ShellConfig::from_lookup(lookup(&[
            ("SHELL_LOGIN_PATH", "/signin"),
            ("SHELL_ADMIN_MFE_URL", "https://cdn.example.com/admin/remoteEntry.js"),
            ("SHELL_LOG_FORMAT", "json"),
            ("SHELL_STORAGE_PATH", "/tmp/shell.json"),
        ]))
        .unwrap();

        assert_eq!(config.login_path, "/signin");
        assert_eq!(
            config.remotes[0].entry_url,
            "https://cdn.example.com/admin/remoteEntry.js"
        );
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/shell.json")));
    }

    #[test]
    fn bad_log_format_falls_back() {
        let config = ShellConfig::from_lookup(lookup(&[("SHELL_LOG_FORMAT", "xml")])).unwrap();
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            ShellConfig::from_lookup(lookup(&[("SHELL_LOGIN_PATH", "login")])),
            Err(ConfigError::InvalidLoginPath("login".into()))
        );
        assert_eq!(
            ShellConfig::from_lookup(lookup(&[("SHELL_ADMIN_MFE_URL", " ")])),
            Err(ConfigError::EmptyRemoteUrl("adminMFE".into()))
        );
        assert_eq!(
            ShellConfig::from_lookup(lookup(&[("SHELL_STORAGE_KEY", "")])),
            Err(ConfigError::EmptyStorageKey)
        );
    }
}
