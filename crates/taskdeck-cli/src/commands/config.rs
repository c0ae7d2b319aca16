use std::collections::HashMap;
use std::env;

use taskdeck_core::config::{ClientConfig, API_URL_VAR};
use taskdeck_core::sync::InsertionPolicy;
use taskdeck_core::util::{non_blank, normalize_base_url};

use crate::cli::ConfigCommands;
use crate::commands::common::resolve_client_config;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            insertion,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            api_base_url,
            insertion.map(InsertionPolicy::from),
            no_activate,
        ),
        ConfigCommands::Show { profile } => run_config_show(profile.as_deref().or(global_profile)),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    api_base_url: Option<String>,
    insertion: Option<InsertionPolicy>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(profile_name);
    apply_profile_init(
        &mut config,
        &profile_name,
        api_base_url,
        env::var(API_URL_VAR)
            .ok()
            .as_deref()
            .and_then(non_blank)
            .map(str::to_string),
        insertion,
        no_activate,
    )?;

    let path = config.save()?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let has_api_url = config
        .profile(&profile_name)
        .and_then(CliProfile::api_base_url)
        .is_some();
    if has_api_url {
        println!("Profile '{profile_name}' is ready. Run `taskdeck fetch tasks`.");
    } else {
        println!("Profile '{profile_name}' is missing: api_base_url");
    }

    Ok(())
}

/// Merge explicit flags, then the environment, over the stored profile.
pub fn apply_profile_init(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    explicit_api_base_url: Option<String>,
    env_api_base_url: Option<String>,
    insertion: Option<InsertionPolicy>,
    no_activate: bool,
) -> Result<(), CliError> {
    let merged_api_base_url = explicit_api_base_url
        .as_deref()
        .and_then(non_blank)
        .map(str::to_string)
        .or(env_api_base_url);

    let profile = config.profile_mut_or_default(profile_name);
    if let Some(url) = merged_api_base_url {
        let normalized = normalize_base_url(&url).ok_or_else(|| {
            CliError::Config("api_base_url must include http:// or https://".to_string())
        })?;
        profile.api_base_url = Some(normalized);
    }
    if let Some(policy) = insertion {
        profile.insertion = Some(policy);
    }

    if !no_activate {
        config.active_profile = Some(profile_name.to_string());
    }
    if config.version == 0 {
        config.version = 1;
    }
    Ok(())
}

pub fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load()?;
    let name = config.resolve_profile_name(profile_name);
    let profile = config.profile(&name).cloned().unwrap_or_default();
    let env_values: HashMap<String, String> = env::vars().collect();
    let effective = resolve_client_config(&env_values, &profile)?;

    for line in format_config_lines(&name, config.profile(&name).is_some(), &effective) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_config_lines(name: &str, stored: bool, config: &ClientConfig) -> Vec<String> {
    let origin = if stored { "" } else { " (not saved)" };
    vec![
        format!("profile: {name}{origin}"),
        format!(
            "api_url: {}",
            config.api_url.as_deref().unwrap_or("<unset>")
        ),
        format!(
            "access_token: {}",
            if config.access_token.is_some() {
                "[REDACTED]"
            } else {
                "<unset>"
            }
        ),
        format!("http_timeout: {}s", config.http_timeout.as_secs()),
        format!("insertion: {}", config.sync.insertion),
        format!("before_ready: {:?}", config.sync.before_ready),
        format!("revisions: {:?}", config.sync.revisions),
    ]
}
