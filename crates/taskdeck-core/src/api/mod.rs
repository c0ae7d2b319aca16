//! Snapshot fetching over HTTP.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::session::Session;
use crate::util::truncate_chars;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Invalid snapshot payload: {0}")]
    InvalidPayload(String),
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

const ERROR_BODY_CHARS: usize = 180;

/// A backend collection that can be listed in one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tasks,
    Goals,
    Meetings,
    Posts,
    Messages { conversation_id: String },
}

impl Endpoint {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Tasks => "/api/tasks".to_string(),
            Self::Goals => "/api/goals".to_string(),
            Self::Meetings => "/api/meetings".to_string(),
            Self::Posts => "/api/posts".to_string(),
            Self::Messages { conversation_id } => format!("/api/messages/{conversation_id}"),
        }
    }

    /// File name used when snapshots are stored on disk.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self {
            Self::Messages { conversation_id } => format!("messages-{conversation_id}.json"),
            other => format!("{}.json", other.resource()),
        }
    }

    #[must_use]
    pub const fn resource(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Goals => "goals",
            Self::Meetings => "meetings",
            Self::Posts => "posts",
            Self::Messages { .. } => "messages",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Messages { conversation_id } => write!(f, "messages:{conversation_id}"),
            other => f.write_str(other.resource()),
        }
    }
}

/// Conversation ids end up in a URL path segment and a file name.
fn is_conversation_id(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl FromStr for Endpoint {
    type Err = String;

    /// Accepts `tasks`, `goals`, `meetings`, `posts` and `messages:<conversation>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if let Some(conversation_id) = value.strip_prefix("messages:") {
            let conversation_id = conversation_id.trim();
            if conversation_id.is_empty() {
                return Err("messages needs a conversation id, e.g. messages:abc123".to_string());
            }
            if !is_conversation_id(conversation_id) {
                return Err(format!(
                    "conversation id `{conversation_id}` may only contain letters, digits, `-` and `_`"
                ));
            }
            return Ok(Self::Messages {
                conversation_id: conversation_id.to_string(),
            });
        }

        match value.to_ascii_lowercase().as_str() {
            "tasks" => Ok(Self::Tasks),
            "goals" => Ok(Self::Goals),
            "meetings" => Ok(Self::Meetings),
            "posts" | "feed" => Ok(Self::Posts),
            "messages" => Err("messages needs a conversation id, e.g. messages:abc123".to_string()),
            other => Err(format!(
                "unknown resource `{other}` (expected tasks, goals, meetings, posts or messages:<id>)"
            )),
        }
    }
}

/// Anything that can produce a full snapshot of an endpoint.
pub trait SnapshotSource {
    fn fetch_snapshot<E>(&self, endpoint: &Endpoint) -> impl Future<Output = ApiResult<Vec<E>>> + Send
    where
        E: DeserializeOwned + Send;
}

/// Fetches snapshots from the backend with a fixed [`Session`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    session: Session,
    client: Client,
}

impl ApiClient {
    pub fn new(session: Session, timeout: Duration) -> ApiResult<Self> {
        if timeout.is_zero() {
            return Err(ApiError::InvalidConfiguration(
                "HTTP timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            session,
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

impl SnapshotSource for ApiClient {
    fn fetch_snapshot<E>(&self, endpoint: &Endpoint) -> impl Future<Output = ApiResult<Vec<E>>> + Send
    where
        E: DeserializeOwned + Send,
    {
        async move {
            let url = self.session.url(&endpoint.path());
            tracing::debug!(%endpoint, "Fetching snapshot");

            let mut request = self
                .client
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json");
            if let Some(token) = self.session.access_token() {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::Api(parse_api_error(status, &body)));
            }

            let body = response.text().await?;
            let snapshot = parse_snapshot::<E>(&body)?;
            tracing::info!(%endpoint, entities = snapshot.len(), "Fetched snapshot");
            Ok(snapshot)
        }
    }
}

/// Parse a snapshot body: a bare JSON array or an object wrapping one in `data`.
///
/// Public for testability.
pub fn parse_snapshot<E: DeserializeOwned>(body: &str) -> ApiResult<Vec<E>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| ApiError::InvalidPayload(format!("invalid JSON: {error}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ApiError::InvalidPayload(
                    "expected a JSON array or an object with a `data` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ApiError::InvalidPayload(
                "expected a JSON array of entities".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<E>(item).map_err(|error| {
                ApiError::InvalidPayload(format!("entity at index {index}: {error}"))
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = truncate_chars(body, ERROR_BODY_CHARS);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
