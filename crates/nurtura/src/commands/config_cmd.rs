//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::{ExposeSecret, SecretString};

use nurtura_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Copy of `cfg` safe to print: plaintext tokens are masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(REDACTED.into());
        }
    }
    cfg
}

fn prompt_token() -> Result<SecretString, CliError> {
    let token = rpassword::prompt_password("Access token: ").map_err(prompt_err)?;
    if token.trim().is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "access token cannot be empty".into(),
        });
    }
    Ok(SecretString::from(token.trim().to_owned()))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("Nurtura CLI configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let api_url: String = Input::new()
                .with_prompt("API base URL")
                .default("https://api.nurtura.app/api/v1".into())
                .validate_with(|input: &String| -> Result<(), String> {
                    match url::Url::parse(input) {
                        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
                        Ok(url) => Err(format!("expected http or https, got {}", url.scheme())),
                        Err(e) => Err(e.to_string()),
                    }
                })
                .interact_text()
                .map_err(prompt_err)?;

            let email: String = Input::new()
                .with_prompt("Account email (optional)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let token = prompt_token()?;

            let store_choices = &[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
            ];
            let store_selection = Select::new()
                .with_prompt("Where to store the access token?")
                .items(store_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let plaintext = if store_selection == 0 {
                nurtura_config::store_token(&profile_name, &token)?;
                eprintln!("   ✓ Access token stored in system keyring");
                None
            } else {
                Some(token.expose_secret().to_owned())
            };

            let mut cfg = config::load_config_or_default();
            cfg.default_profile = Some(profile_name.clone());
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    api_url: Some(api_url),
                    email: (!email.is_empty()).then_some(email),
                    token: plaintext,
                    token_env: None,
                    timeout_secs: None,
                },
            );

            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: nurtura team list");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unrenderable: {e}>")),
                |c| c.api_url.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let token = match global.token {
                Some(ref token) => SecretString::from(token.clone()),
                None => prompt_token()?,
            };
            nurtura_config::store_token(&profile_name, &token)?;
            eprintln!("✓ Access token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}
