// SPDX-License-Identifier: MIT
//
// Configuration.
//
// Override hierarchy: defaults → `~/.pport/config.toml` → environment →
// CLI flags. Every file setting is optional. A missing default file is
// created with all options commented out, so the knobs are discoverable.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pport_term::text::strip_control_and_style;

use crate::session::{
    DEFAULT_BLINK_INTERVAL, DEFAULT_HISTORY_LIMIT, DEFAULT_POLL_INTERVAL, DEFAULT_SPIN_INTERVAL,
    SessionConfig,
};
use crate::transport::DEFAULT_SERVER;

pub const DEFAULT_REDRAW_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Name used when none is given or the given one is blank.
pub const ANONYMOUS: &str = "unknown";

// ─── File model ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PportConfig {
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    pub server: Option<String>,
    pub username: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub redraw_interval_ms: Option<u64>,
    pub blink_interval_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub history_limit: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ─── Locations ───────────────────────────────────────────────────────────────

/// `~/.pport`
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pport"))
}

/// `~/.pport/config.toml`
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// `~/.pport/pport.log`
#[must_use]
pub fn default_log_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("pport.log"))
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Parse config text. `origin` only labels errors.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML or mistyped values.
pub fn parse(text: &str, origin: &Path) -> Result<PportConfig, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })
}

/// Load the config file.
///
/// With an explicit `path` the file must exist. Without one the default
/// location is used; if that file is missing a commented template is
/// written there and defaults are returned.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when an explicit file cannot be read and
/// [`ConfigError::Parse`] when any file is malformed.
pub fn load(path: Option<&Path>) -> Result<PportConfig, ConfigError> {
    if let Some(path) = path {
        return read(path);
    }

    let Some(path) = config_path() else {
        warn!("could not determine home directory, using default config");
        return Ok(PportConfig::default());
    };

    if !path.exists() {
        info!("no config file, writing template to {}", path.display());
        write_template(&path);
        return Ok(PportConfig::default());
    }

    read(&path)
}

fn read(path: &Path) -> Result<PportConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse(&text, path)?;
    info!("loaded config from {}", path.display());
    debug!("config: {config:?}");
    Ok(config)
}

const TEMPLATE: &str = r#"# pport configuration
# Every setting is optional. Override order: defaults → this file → env → CLI flags.

# [client]
# server = "https://pport.top"     # or PPORT_SERVER / BASE_URL, or --server
# username = "anon"                # or PPORT_USERNAME, or --name
# poll_interval_ms = 2000
# redraw_interval_ms = 50
# blink_interval_ms = 500
# request_timeout_ms = 5000
# history_limit = 1000
"#;

fn write_template(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("failed to create config directory: {e}");
            return;
        }
    }
    if let Err(e) = fs::write(path, TEMPLATE) {
        warn!("failed to write config template: {e}");
    }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliOverrides {
    pub server: Option<String>,
    pub username: Option<String>,
    pub poll_ms: Option<u64>,
    pub redraw_ms: Option<u64>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub server: String,
    /// `None` when no layer named the user; the binary then prompts.
    pub username: Option<String>,
    pub poll_interval: Duration,
    pub redraw_interval: Duration,
    pub blink_interval: Duration,
    pub request_timeout: Duration,
    pub history_limit: usize,
}

impl ResolvedConfig {
    /// Session settings for `username`.
    #[must_use]
    pub fn session(&self, username: &str) -> SessionConfig {
        SessionConfig {
            username: normalize_username(username),
            poll_interval: self.poll_interval,
            blink_interval: self.blink_interval,
            spin_interval: DEFAULT_SPIN_INTERVAL,
            history_limit: self.history_limit,
        }
    }
}

/// Resolve against the process environment.
#[must_use]
pub fn resolve(config: &PportConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with(config, cli, |key| std::env::var(key).ok())
}

/// Resolve with an explicit environment lookup.
#[must_use]
pub fn resolve_with(
    config: &PportConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let file = &config.client;
    let nonempty = |s: String| (!s.trim().is_empty()).then_some(s);

    // Server: CLI → PPORT_SERVER → BASE_URL → file → default
    let server = cli
        .server
        .clone()
        .or_else(|| env("PPORT_SERVER").and_then(nonempty))
        .or_else(|| env("BASE_URL").and_then(nonempty))
        .or_else(|| file.server.clone())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());

    // Username: CLI → PPORT_USERNAME → file
    let username = cli
        .username
        .clone()
        .or_else(|| env("PPORT_USERNAME"))
        .or_else(|| file.username.clone())
        .and_then(nonempty);

    let ms = |flag: Option<u64>, setting: Option<u64>, default: Duration| {
        flag.or(setting).map_or(default, Duration::from_millis)
    };

    ResolvedConfig {
        server,
        username,
        poll_interval: ms(cli.poll_ms, file.poll_interval_ms, DEFAULT_POLL_INTERVAL),
        redraw_interval: ms(cli.redraw_ms, file.redraw_interval_ms, DEFAULT_REDRAW_INTERVAL),
        blink_interval: ms(None, file.blink_interval_ms, DEFAULT_BLINK_INTERVAL),
        request_timeout: ms(None, file.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT),
        history_limit: file.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
    }
}

/// Strip escapes and controls, trim, and fall back to [`ANONYMOUS`].
#[must_use]
pub fn normalize_username(raw: &str) -> String {
    let clean = strip_control_and_style(raw);
    let trimmed = clean.trim();
    if trimmed.is_empty() {
        ANONYMOUS.to_string()
    } else {
        trimmed.to_string()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
