//! Named connection profiles persisted as JSON in the user config directory.

use std::collections::BTreeMap;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use taskdeck_core::sync::InsertionPolicy;
use taskdeck_core::util::{non_blank, normalize_base_url};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const FALLBACK_PROFILE: &str = "default";
pub const PROFILE_ENV_VAR: &str = "TASKDECK_PROFILE";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Could not locate the user config directory")]
    NoConfigDir,
    #[error("Failed to read profiles at {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse profiles at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write profiles at {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to encode profiles: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

/// Connection settings stored under one profile name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    /// Replay insertion policy used when `--insertion` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertion: Option<InsertionPolicy>,
}

const fn current_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, ProfileError> {
    let base = dirs::config_dir().ok_or(ProfileError::NoConfigDir)?;
    Ok(base.join("taskdeck").join(CONFIG_FILE_NAME))
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, ProfileError> {
        Self::load_from_path(&default_config_path()?)
    }

    /// A missing file is an empty configuration.
    pub fn load_from_path(path: &Path) -> Result<Self, ProfileError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ProfileError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut config: Self = serde_json::from_str(&raw).map_err(|source| ProfileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.tidy();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ProfileError> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ProfileError> {
        let write_error = |source| ProfileError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut tidy = self.clone();
        tidy.tidy();
        let encoded = serde_json::to_string_pretty(&tidy).map_err(ProfileError::Encode)?;
        std::fs::write(path, encoded).map_err(write_error)
    }

    /// Explicit flag, then `TASKDECK_PROFILE`, then the active profile, then `default`.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        let from_env = std::env::var(PROFILE_ENV_VAR).ok();
        self.resolve_profile_name_with(explicit, from_env.as_deref())
    }

    pub fn resolve_profile_name_with(&self, explicit: Option<&str>, from_env: Option<&str>) -> String {
        explicit
            .and_then(non_blank)
            .or_else(|| from_env.and_then(non_blank))
            .or_else(|| self.active_profile.as_deref().and_then(non_blank))
            .unwrap_or(FALLBACK_PROFILE)
            .to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn tidy(&mut self) {
        self.active_profile = self
            .active_profile
            .as_deref()
            .and_then(non_blank)
            .map(str::to_string);
        for profile in self.profiles.values_mut() {
            profile.api_base_url = profile.api_base_url();
        }
    }
}

impl CliProfile {
    /// The stored URL, trimmed and without trailing slashes. Hand-edited
    /// values lacking a scheme are dropped.
    pub fn api_base_url(&self) -> Option<String> {
        self.api_base_url.as_deref().and_then(normalize_base_url)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn saved_profiles_load_back_tidied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" work ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "work".to_string(),
            CliProfile {
                api_base_url: Some(" https://api.example.com/ ".to_string()),
                insertion: Some(InsertionPolicy::Surface),
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();

        assert_eq!(loaded.active_profile.as_deref(), Some("work"));
        assert_eq!(
            loaded.profile("work"),
            Some(&CliProfile {
                api_base_url: Some("https://api.example.com".to_string()),
                insertion: Some(InsertionPolicy::Surface),
            })
        );
    }

    #[test]
    fn missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CliProfilesConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliProfilesConfig::default());
    }

    #[test]
    fn corrupt_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{not json").unwrap();

        let error = CliProfilesConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(error, ProfileError::Parse { .. }));
        assert!(error.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn schemeless_url_is_dropped() {
        let profile = CliProfile {
            api_base_url: Some("api.example.com".to_string()),
            insertion: None,
        };
        assert_eq!(profile.api_base_url(), None);
    }

    #[test]
    fn profile_name_prefers_explicit_then_env_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(config.resolve_profile_name_with(Some("laptop"), Some("ci")), "laptop");
        assert_eq!(config.resolve_profile_name_with(Some("  "), Some("ci")), "ci");
        assert_eq!(config.resolve_profile_name_with(None, Some(" ")), "work");
        assert_eq!(
            CliProfilesConfig::default().resolve_profile_name_with(None, None),
            "default"
        );
    }
}
