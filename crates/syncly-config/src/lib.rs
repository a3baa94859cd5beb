//! Shared configuration for the syncly CLI.
//!
//! TOML profiles, API token resolution (env + keyring + plaintext),
//! and translation into `syncly_api::TransportConfig` plus the controller
//! flags. The CLI layers its `GlobalOpts` overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use syncly_api::{TODOS_PATH, TlsMode, TransportConfig};

/// Overrides the config file location when set.
pub const CONFIG_ENV: &str = "SYNCLY_CONFIG";

const KEYRING_SERVICE: &str = "syncly";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick the active profile: `requested`, else `default_profile`, else "default".
    pub fn profile<'a>(&'a self, requested: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named server profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "http://localhost:3000").
    pub base_url: String,

    /// Collection path under the base URL.
    #[serde(default = "default_resource")]
    pub resource: String,

    /// Fetch the collection as soon as a controller starts.
    #[serde(default = "default_true")]
    pub auto_fetch: bool,

    /// Show mutations before the server confirms them.
    #[serde(default = "default_true")]
    pub optimistic: bool,

    /// Bearer token (plaintext, prefer keyring or env var).
    pub api_token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub api_token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            resource: default_resource(),
            auto_fetch: true,
            optimistic: true,
            api_token: None,
            api_token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }
}

fn default_resource() -> String {
    TODOS_PATH.into()
}
fn default_true() -> bool {
    true
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `SYNCLY_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("dev", "syncly", "syncly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("syncly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) with `SYNCLY_` env overrides,
/// e.g. `SYNCLY_DEFAULTS__TIMEOUT=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SYNCLY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the bearer token: profile env var → keyring → plaintext.
/// `None` when the profile has no token at all (anonymous server).
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's api_token_env → env var lookup
    if let Some(ref env_name) = profile.api_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .api_token
        .as_ref()
        .map(|token| SecretString::from(token.clone()))
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))
        .and_then(|entry| entry.set_password(token))
        .map_err(|e| ConfigError::Validation {
            field: "api_token".into(),
            reason: format!("keyring unavailable: {e}"),
        })
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/api-token")
}

// ── Profile translation ─────────────────────────────────────────────

/// Everything needed to build a client and a controller for one profile.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: Url,
    pub resource: String,
    pub transport: TransportConfig,
    pub auto_fetch: bool,
    pub optimistic: bool,
}

/// Build `ClientSettings` from a profile, falling back to `defaults` for
/// TLS and timeout. No CLI flag overrides.
pub fn profile_to_settings(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientSettings, ConfigError> {
    let base_url = parse_base_url(&profile.base_url)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(ClientSettings {
        base_url,
        resource: profile.resource.clone(),
        transport: TransportConfig {
            tls,
            timeout,
            token: resolve_token(profile, profile_name),
        },
        auto_fetch: profile.auto_fetch,
        optimistic: profile.optimistic,
    })
}

/// Validate a server URL (http or https only).
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
timeout = 10

[profiles.home]
base_url = "http://localhost:3000"
api_token = "plain"

[profiles.lab]
base_url = "https://lab.example.com"
resource = "/v2/todos"
optimistic = false
insecure = true
timeout = 5
"#;

    fn sample_config() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn profile_fields_fall_back_to_defaults() {
        let cfg = sample_config();
        let (name, home) = cfg.profile(None).unwrap();

        assert_eq!(name, "home");
        assert_eq!(home.resource, "/api/todos");
        assert!(home.auto_fetch);
        assert!(home.optimistic);
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.defaults.timeout, 10);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let cfg = sample_config();
        assert!(matches!(
            cfg.profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn settings_use_profile_overrides() {
        let cfg = sample_config();
        let (name, lab) = cfg.profile(Some("lab")).unwrap();
        let settings = profile_to_settings(lab, name, &cfg.defaults).unwrap();

        assert_eq!(settings.base_url.as_str(), "https://lab.example.com/");
        assert_eq!(settings.resource, "/v2/todos");
        assert!(!settings.optimistic);
        assert!(matches!(settings.transport.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(settings.transport.timeout, Duration::from_secs(5));
    }

    #[test]
    fn settings_inherit_default_timeout_and_plaintext_token() {
        let cfg = sample_config();
        let (name, home) = cfg.profile(None).unwrap();
        let settings = profile_to_settings(home, name, &cfg.defaults).unwrap();

        assert!(matches!(settings.transport.tls, TlsMode::System));
        assert_eq!(settings.transport.timeout, Duration::from_secs(10));
        assert_eq!(
            settings.transport.token.as_ref().map(|t| t.expose_secret().to_owned()),
            Some("plain".to_owned())
        );
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(parse_base_url("http://localhost:3000").is_ok());
        assert!(matches!(
            parse_base_url("ftp://example.com"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles
            .insert("default".into(), Profile::new("http://127.0.0.1:8080"));
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let (_, profile) = loaded.profile(None).unwrap();
        assert_eq!(profile.base_url, "http://127.0.0.1:8080");
    }
}
