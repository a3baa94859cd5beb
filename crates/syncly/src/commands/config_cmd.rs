//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Password, Select};

use syncly_config::parse_base_url;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { name, url } => {
            let mut cfg = config::load_config()?;
            let (profile_name, profile) = match url {
                Some(url) => init_from_flags(name, &url, global)?,
                None if std::io::stdin().is_terminal() => init_interactive(name)?,
                None => {
                    return Err(CliError::Validation {
                        field: "url".into(),
                        reason: "pass --url when not running in a terminal".into(),
                    });
                }
            };

            // The first profile becomes the default.
            let has_default = cfg
                .default_profile
                .as_ref()
                .is_some_and(|d| cfg.profiles.contains_key(d));
            if !has_default {
                cfg.default_profile = Some(profile_name.clone());
            }
            cfg.profiles.insert(profile_name.clone(), profile);

            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Configuration written to {}", path.display());
                eprintln!("  Profile: {profile_name}");
                eprintln!("\n  Test it: syncly todos list -p {profile_name}");
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = config::load_config()?;
            redact(&mut cfg);
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

fn redact(cfg: &mut Config) {
    for profile in cfg.profiles.values_mut() {
        if profile.api_token.is_some() {
            profile.api_token = Some(REDACTED.into());
        }
    }
}

fn init_from_flags(
    name: Option<String>,
    url: &str,
    global: &GlobalOpts,
) -> Result<(String, Profile), CliError> {
    parse_base_url(url)?;
    let profile_name = name.unwrap_or_else(|| "default".into());
    let profile = Profile::new(url);
    if let Some(ref token) = global.token {
        config::store_token(&profile_name, token)?;
    }
    Ok((profile_name, profile))
}

fn init_interactive(name: Option<String>) -> Result<(String, Profile), CliError> {
    eprintln!("syncly configuration wizard");
    eprintln!("  Config path: {}\n", config::config_path().display());

    let profile_name = match name {
        Some(name) => name,
        None => Input::new()
            .with_prompt("Profile name")
            .default("default".into())
            .interact_text()
            .map_err(prompt_err)?,
    };

    let url: String = Input::new()
        .with_prompt("Server URL")
        .default("http://localhost:3000".into())
        .validate_with(|input: &String| parse_base_url(input).map(|_| ()).map_err(|e| e.to_string()))
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile::new(url);

    let token_choices = &[
        "No token (open server)",
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Bearer token")
        .items(token_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection > 0 {
        let token = Password::new()
            .with_prompt("Token")
            .interact()
            .map_err(prompt_err)?;
        if token.is_empty() {
            return Err(CliError::Validation {
                field: "api_token".into(),
                reason: "token cannot be empty".into(),
            });
        }
        if selection == 1 {
            config::store_token(&profile_name, &token)?;
            eprintln!("  ✓ Token stored in system keyring");
        } else {
            profile.api_token = Some(token);
        }
    }

    Ok((profile_name, profile))
}
