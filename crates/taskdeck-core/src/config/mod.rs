//! Client configuration read from the environment.
//!
//! All values come from `TASKDECK_*` variables. Nothing is required until a
//! command actually needs the network, at which point
//! [`ClientConfig::session`] insists on `TASKDECK_API_URL`.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::session::Session;
use crate::sync::{InsertionPolicy, PendingPolicy, SyncOptions};
use crate::util::{non_blank, normalize_base_url};

pub const API_URL_VAR: &str = "TASKDECK_API_URL";
pub const ACCESS_TOKEN_VAR: &str = "TASKDECK_ACCESS_TOKEN";
pub const HTTP_TIMEOUT_VAR: &str = "TASKDECK_HTTP_TIMEOUT_SECS";
pub const INSERTION_VAR: &str = "TASKDECK_INSERTION";
pub const BEFORE_READY_VAR: &str = "TASKDECK_BEFORE_READY";
pub const REJECT_STALE_VAR: &str = "TASKDECK_REJECT_STALE";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: Option<String>,
    pub access_token: Option<String>,
    pub http_timeout: Duration,
    pub sync: SyncOptions,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_url", &self.api_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("http_timeout", &self.http_timeout)
            .field("sync", &self.sync)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            access_token: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            sync: SyncOptions::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = match optional_trimmed(&lookup, API_URL_VAR) {
            Some(raw) => Some(normalize_base_url(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("{API_URL_VAR} must start with http:// or https://"))
            })?),
            None => None,
        };
        let access_token = optional_trimmed(&lookup, ACCESS_TOKEN_VAR);

        let timeout_secs = value_or_default(
            &lookup,
            HTTP_TIMEOUT_VAR,
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::Invalid(format!("{HTTP_TIMEOUT_VAR} must be an integer in [1, 120]"))
        })?;
        if !(1..=120).contains(&timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "{HTTP_TIMEOUT_VAR} must be in [1, 120]"
            )));
        }

        Ok(Self {
            api_url,
            access_token,
            http_timeout: Duration::from_secs(timeout_secs),
            sync: parse_sync_options(&lookup)?,
        })
    }

    /// Build the request context for network commands.
    pub fn session(&self) -> Result<Session, ConfigError> {
        let api_url = self
            .api_url
            .as_deref()
            .ok_or(ConfigError::MissingVar(API_URL_VAR))?;
        Session::new(api_url, self.access_token.clone())
            .map_err(|error| ConfigError::Invalid(error.to_string()))
    }
}

fn parse_sync_options(lookup: impl Fn(&str) -> Option<String>) -> Result<SyncOptions, ConfigError> {
    let mut options = SyncOptions::default();

    if let Some(raw) = optional_trimmed(&lookup, INSERTION_VAR) {
        options.insertion = raw
            .parse::<InsertionPolicy>()
            .map_err(|error| ConfigError::Invalid(format!("{INSERTION_VAR}: {error}")))?;
    }
    if let Some(raw) = optional_trimmed(&lookup, BEFORE_READY_VAR) {
        options.before_ready = raw
            .parse::<PendingPolicy>()
            .map_err(|error| ConfigError::Invalid(format!("{BEFORE_READY_VAR}: {error}")))?;
    }
    if let Some(raw) = optional_trimmed(&lookup, REJECT_STALE_VAR) {
        if parse_flag(&raw).ok_or_else(|| {
            ConfigError::Invalid(format!("{REJECT_STALE_VAR} must be true or false"))
        })? {
            options = options.reject_stale();
        }
    }

    Ok(options)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).as_deref().and_then(non_blank).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sync::RevisionPolicy;

    fn config(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ClientConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(config(&[]).unwrap(), ClientConfig::default());
    }

    #[test]
    fn session_requires_api_url() {
        let error = config(&[]).unwrap().session().unwrap_err();
        assert!(error.to_string().contains(API_URL_VAR));
    }

    #[test]
    fn parses_every_variable() {
        let parsed = config(&[
            (API_URL_VAR, "https://api.example.com/"),
            (ACCESS_TOKEN_VAR, "token-123"),
            (HTTP_TIMEOUT_VAR, " 30 "),
            (INSERTION_VAR, "surface"),
            (BEFORE_READY_VAR, "queue"),
            (REJECT_STALE_VAR, "yes"),
        ])
        .unwrap();

        assert_eq!(parsed.api_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(parsed.http_timeout, Duration::from_secs(30));
        assert_eq!(parsed.sync.insertion, InsertionPolicy::Surface);
        assert_eq!(parsed.sync.before_ready, PendingPolicy::Queue);
        assert_eq!(parsed.sync.revisions, RevisionPolicy::RejectStale);

        let session = parsed.session().unwrap();
        assert_eq!(session.access_token(), Some("token-123"));
    }

    #[test]
    fn rejects_out_of_range_and_unknown_values() {
        for pairs in [
            [(HTTP_TIMEOUT_VAR, "0")],
            [(HTTP_TIMEOUT_VAR, "121")],
            [(HTTP_TIMEOUT_VAR, "soon")],
            [(API_URL_VAR, "api.example.com")],
            [(INSERTION_VAR, "middle")],
            [(REJECT_STALE_VAR, "maybe")],
        ] {
            assert!(
                matches!(config(&pairs), Err(ConfigError::Invalid(_))),
                "{pairs:?}"
            );
        }
    }

    #[test]
    fn debug_redacts_access_token() {
        let parsed = config(&[(ACCESS_TOKEN_VAR, "sensitive-token")]).unwrap();
        let debug = format!("{parsed:?}");
        assert!(!debug.contains("sensitive-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
