//! Configuration Vault – reads `~/.pong-relay/config.toml`.
//!
//! ```toml
//! session_queue = 256
//!
//! [web_server.local]
//! host = "127.0.0.1"
//! port = 5000
//!
//! [web_server.prod]
//! host = "0.0.0.0"
//! port = 80
//!
//! [routes]
//! from_paddle = "paddle"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use relay_bus::RouteTable;
use relay_types::{FROM_BROWSER, FROM_SERIAL_MONITOR, MESSAGE, RelayError};
use serde::Deserialize;
use tracing::{info, warn};

/// Inbound events whose routing is fixed.
const PROTOCOL_EVENTS: [&str; 3] = [MESSAGE, FROM_BROWSER, FROM_SERIAL_MONITOR];

/// Which `[web_server.*]` table the process listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerMode {
    #[default]
    Local,
    Prod,
}

impl ServerMode {
    /// `--prod` selects [`ServerMode::Prod`]; otherwise [`ServerMode::Local`].
    pub fn from_prod_flag(prod: bool) -> Self {
        if prod { ServerMode::Prod } else { ServerMode::Local }
    }
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMode::Local => write!(f, "local"),
            ServerMode::Prod => write!(f, "prod"),
        }
    }
}

/// Listen address for one mode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// WebSocket URL a local client uses to reach this listener.
    ///
    /// A wildcard bind address is reached through loopback.
    pub fn ws_url(&self) -> String {
        let host = match self.host.as_str() {
            "0.0.0.0" | "" => "127.0.0.1",
            "::" => "[::1]",
            other => other,
        };
        format!("ws://{host}:{}/", self.port)
    }
}

/// `[web_server]` table: one entry per [`ServerMode`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebServer {
    #[serde(default = "default_local")]
    pub local: ServerSettings,

    #[serde(default = "default_prod")]
    pub prod: ServerSettings,
}

impl Default for WebServer {
    fn default() -> Self {
        Self {
            local: default_local(),
            prod: default_prod(),
        }
    }
}

/// Relay configuration stored in `~/.pong-relay/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Outbound frames buffered per session before frames are dropped for it.
    #[serde(default = "default_session_queue")]
    pub session_queue: usize,

    #[serde(default)]
    pub web_server: WebServer,

    /// Extra forwarding routes, inbound event name → outbound event name.
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
}

fn default_local() -> ServerSettings {
    ServerSettings {
        host: "127.0.0.1".to_string(),
        port: 5000,
    }
}
fn default_prod() -> ServerSettings {
    ServerSettings {
        host: "0.0.0.0".to_string(),
        port: 80,
    }
}
fn default_session_queue() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_queue: default_session_queue(),
            web_server: WebServer::default(),
            routes: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Listen address for `mode`.
    pub fn server_settings(&self, mode: ServerMode) -> ServerSettings {
        match mode {
            ServerMode::Local => self.web_server.local.clone(),
            ServerMode::Prod => self.web_server.prod.clone(),
        }
    }

    /// The default route table plus every configured extra route.
    ///
    /// Extra routes only add events; entries naming a built-in protocol
    /// event are skipped so `message` stays log-only.
    pub fn route_table(&self) -> RouteTable {
        self.routes
            .iter()
            .fold(RouteTable::default(), |table, (inbound, outbound)| {
                if PROTOCOL_EVENTS.contains(&inbound.as_str()) {
                    warn!(event = %inbound, "ignoring route for built-in event");
                    table
                } else {
                    table.with_forward(inbound.as_str(), outbound.as_str())
                }
            })
    }
}

/// Return the path to `~/.pong-relay/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".pong-relay").join("config.toml")
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
///
/// # Errors
///
/// [`RelayError::Config`] if the file cannot be read or parsed.
pub fn load_from(path: &Path) -> Result<Option<Config>, RelayError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RelayError::Config(format!("Failed to read config at {}: {}", path.display(), e))
    })?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| {
        RelayError::Config(format!("Failed to parse config at {}: {}", path.display(), e))
    })?;
    Ok(Some(cfg))
}

/// Load `path` (or the default path), falling back to [`Config::default`]
/// when the file is absent or unreadable.
pub fn load_or_default(path: Option<&Path>) -> Config {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    match load_from(&path) {
        Ok(Some(cfg)) => {
            info!(path = %path.display(), "config loaded");
            cfg
        }
        Ok(None) => {
            info!(path = %path.display(), "no config file, using defaults");
            Config::default()
        }
        Err(e) => {
            warn!(error = %e, "config error, using defaults");
            Config::default()
        }
    }
}

/// Apply `PONG_RELAY_*` environment variable overrides to the resolved
/// listen address.
///
/// | Variable | Field |
/// |---|---|
/// | `PONG_RELAY_HOST` | `host` |
/// | `PONG_RELAY_PORT` | `port` (ignored unless a valid `u16`) |
pub fn apply_env_overrides(settings: &mut ServerSettings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(
    settings: &mut ServerSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(host) = lookup("PONG_RELAY_HOST") {
        settings.host = host;
    }
    if let Some(v) = lookup("PONG_RELAY_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        settings.port = port;
    }
}
