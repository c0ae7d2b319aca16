//! Push event decoding.
//!
//! The push transport delivers one JSON object per mutation:
//!
//! ```json
//! {"type": "update", "id": "64f0c2", "payload": {"completed": true}}
//! ```
//!
//! Decoding turns a frame into a typed [`MutationEvent`] or rejects it with
//! [`Error::MalformedEvent`]. Nothing here touches a collection, so a bad
//! frame can be logged and dropped without corrupting local state.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::models::{Entity, EntityId};
use crate::{Error, Result};

/// The three mutations a push event can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "created" | "insert" | "new" => Ok(Self::Create),
            "update" | "updated" | "patch" | "edit" => Ok(Self::Update),
            "delete" | "deleted" | "remove" | "removed" => Ok(Self::Delete),
            other => Err(Error::MalformedEvent(format!("unknown event type `{other}`"))),
        }
    }
}

/// A single decoded mutation for entity type `E`.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent<E: Entity> {
    Create(E),
    Update { id: EntityId, patch: E::Patch },
    Delete { id: EntityId },
}

impl<E: Entity> MutationEvent<E> {
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Create(entity) => entity.id(),
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        match self {
            Self::Create(_) => MutationKind::Create,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete { .. } => MutationKind::Delete,
        }
    }
}

/// Decode one raw push frame.
pub fn decode_event<E>(frame: &str) -> Result<MutationEvent<E>>
where
    E: Entity + DeserializeOwned,
    E::Patch: DeserializeOwned,
{
    let value: Value = serde_json::from_str(frame)
        .map_err(|error| Error::MalformedEvent(format!("invalid JSON: {error}")))?;
    decode_event_value(value)
}

/// Decode an already-parsed push frame.
pub fn decode_event_value<E>(value: Value) -> Result<MutationEvent<E>>
where
    E: Entity + DeserializeOwned,
    E::Patch: DeserializeOwned,
{
    let Value::Object(mut envelope) = value else {
        return Err(Error::MalformedEvent(
            "event frame must be a JSON object".to_string(),
        ));
    };

    let kind = match envelope.remove("type").or_else(|| envelope.remove("event")) {
        Some(Value::String(raw)) => raw.parse::<MutationKind>()?,
        Some(_) => {
            return Err(Error::MalformedEvent(
                "event `type` must be a string".to_string(),
            ))
        }
        None => return Err(Error::MalformedEvent("event is missing `type`".to_string())),
    };

    let envelope_id = take_id(&mut envelope)?;
    let payload = match envelope.remove("payload").or_else(|| envelope.remove("data")) {
        None | Some(Value::Null) => None,
        Some(Value::Object(payload)) => Some(payload),
        Some(_) => {
            return Err(Error::MalformedEvent(format!(
                "{kind} event payload must be a JSON object"
            )))
        }
    };

    match kind {
        MutationKind::Create => {
            let mut payload = require_payload(kind, payload)?;
            let id = reconcile_ids(envelope_id, take_id(&mut payload)?)?;
            payload.insert("id".to_string(), Value::String(id.to_string()));
            let entity = serde_json::from_value::<E>(Value::Object(payload)).map_err(|error| {
                Error::MalformedEvent(format!("create payload for `{id}` is invalid: {error}"))
            })?;
            Ok(MutationEvent::Create(entity))
        }
        MutationKind::Update => {
            let mut payload = require_payload(kind, payload)?;
            let id = reconcile_ids(envelope_id, take_id(&mut payload)?)?;
            let patch =
                serde_json::from_value::<E::Patch>(Value::Object(payload)).map_err(|error| {
                    Error::MalformedEvent(format!("update patch for `{id}` is invalid: {error}"))
                })?;
            Ok(MutationEvent::Update { id, patch })
        }
        MutationKind::Delete => {
            let payload_id = match payload {
                Some(mut payload) => take_id(&mut payload)?,
                None => None,
            };
            let id = reconcile_ids(envelope_id, payload_id)?;
            Ok(MutationEvent::Delete { id })
        }
    }
}

fn require_payload(
    kind: MutationKind,
    payload: Option<Map<String, Value>>,
) -> Result<Map<String, Value>> {
    payload.ok_or_else(|| Error::MalformedEvent(format!("{kind} event is missing its payload")))
}

/// Pull `id`/`_id` out of an object. Blank or non-string ids are malformed.
fn take_id(object: &mut Map<String, Value>) -> Result<Option<EntityId>> {
    let mut found: Option<EntityId> = None;
    for key in ["id", "_id"] {
        let Some(raw) = object.remove(key) else {
            continue;
        };
        let id = match raw {
            Value::String(raw) => EntityId::new(raw)
                .map_err(|_| Error::MalformedEvent(format!("`{key}` is blank")))?,
            Value::Null => return Err(Error::MalformedEvent(format!("`{key}` is null"))),
            _ => return Err(Error::MalformedEvent(format!("`{key}` must be a string"))),
        };
        found = Some(reconcile_ids(found, Some(id))?);
    }
    Ok(found)
}

fn reconcile_ids(outer: Option<EntityId>, inner: Option<EntityId>) -> Result<EntityId> {
    match (outer, inner) {
        (Some(outer), Some(inner)) if outer != inner => Err(Error::MalformedEvent(format!(
            "conflicting ids `{outer}` and `{inner}`"
        ))),
        (Some(id), _) | (None, Some(id)) => Ok(id),
        (None, None) => Err(Error::MalformedEvent("event is missing `id`".to_string())),
    }
}
