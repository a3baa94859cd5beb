//! CLI configuration: thin wrapper around `syncly_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--base-url, --token, etc.).

use std::time::Duration;

use secrecy::SecretString;

use syncly_api::{TlsMode, TransportConfig};
use syncly_config::{ClientSettings, ConfigError, parse_base_url, profile_to_settings};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use syncly_config::{Config, Profile, config_path, load_config, save_config, store_token};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Build `ClientSettings` from the config file, profile, and CLI overrides.
pub fn resolve_settings(global: &GlobalOpts) -> Result<ClientSettings, CliError> {
    let cfg = load_config()?;
    settings_from(&cfg, global)
}

fn settings_from(cfg: &Config, global: &GlobalOpts) -> Result<ClientSettings, CliError> {
    match cfg.profile(global.profile.as_deref()) {
        Ok((name, profile)) => {
            let settings = profile_to_settings(profile, name, &cfg.defaults)?;
            apply_overrides(settings, global)
        }
        // An explicitly requested profile must exist.
        Err(ConfigError::UnknownProfile { name }) if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            })
        }
        Err(ConfigError::UnknownProfile { .. }) => flags_only(cfg, global),
        Err(e) => Err(e.into()),
    }
}

/// No profile: build from CLI flags and env vars alone.
fn flags_only(cfg: &Config, global: &GlobalOpts) -> Result<ClientSettings, CliError> {
    let url_str = global.base_url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;

    let settings = ClientSettings {
        base_url: parse_base_url(url_str)?,
        resource: syncly_api::TODOS_PATH.into(),
        transport: TransportConfig {
            tls: TlsMode::System,
            timeout: Duration::from_secs(cfg.defaults.timeout),
            token: None,
        },
        auto_fetch: true,
        optimistic: true,
    };
    apply_overrides(settings, global)
}

/// CLI flags take priority over profile values.
fn apply_overrides(
    mut settings: ClientSettings,
    global: &GlobalOpts,
) -> Result<ClientSettings, CliError> {
    if let Some(ref url) = global.base_url {
        settings.base_url = parse_base_url(url)?;
    }
    if let Some(ref token) = global.token {
        settings.transport.token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        settings.transport.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        settings.transport.timeout = Duration::from_secs(secs);
    }
    if global.no_optimistic {
        settings.optimistic = false;
    }
    Ok(settings)
}
