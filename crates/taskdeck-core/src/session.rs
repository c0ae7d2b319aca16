//! Explicit request context for talking to the backend.

use std::fmt;

use crate::util::{non_blank, normalize_base_url};
use crate::{Error, Result};

/// Where to send requests and which bearer credential to attach.
///
/// Built once by the caller and handed to whatever fetches snapshots, so no
/// component reads credentials from ambient state.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    base_url: String,
    access_token: Option<String>,
}

impl Session {
    /// `base_url` must be an `http(s)` URL; a trailing slash is dropped.
    /// Blank tokens are treated as absent.
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url).ok_or_else(|| {
            Error::InvalidInput(format!(
                "API URL must include http:// or https:// (got `{}`)",
                base_url.trim()
            ))
        })?;
        Ok(Self {
            base_url,
            access_token: access_token.as_deref().and_then(non_blank).map(str::to_string),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Join a path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
