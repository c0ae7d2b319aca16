//! Untyped entity: an id plus an opaque JSON object.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity::{Entity, EntityId, Revision};

const REVISION_FIELDS: [&str; 2] = ["updatedAt", "createdAt"];

/// A JSON object keyed by its `id` (or `_id`) field.
///
/// Used for resources without a typed model and for offline replays where
/// the payload shape is not known ahead of time.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: EntityId,
    fields: Map<String, Value>,
}

impl Record {
    /// Create a record from an id and its non-id fields.
    ///
    /// Any `id`/`_id` key inside `fields` is dropped.
    pub fn new(id: EntityId, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        fields.remove("_id");
        Self { id, fields }
    }

    /// Build a record from a JSON object value.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Render the record back into a flat JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert("id".to_string(), Value::String(self.id.to_string()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

impl Entity for Record {
    type Patch = Map<String, Value>;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn revision(&self) -> Option<Revision> {
        revision_from_fields(&self.fields)
    }

    fn merge(&mut self, patch: Self::Patch) {
        for (key, value) in patch {
            if key == "id" || key == "_id" {
                continue;
            }
            self.fields.insert(key, value);
        }
    }

    fn patch_revision(patch: &Self::Patch) -> Option<Revision> {
        revision_from_fields(patch)
    }
}

fn revision_from_fields(fields: &Map<String, Value>) -> Option<Revision> {
    REVISION_FIELDS.iter().find_map(|name| {
        fields
            .get(*name)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|timestamp| timestamp.with_timezone(&Utc))
    })
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a JSON object with a string `id` or `_id` field")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut fields = Map::new();
        let mut id: Option<EntityId> = None;

        while let Some(key) = access.next_key::<String>()? {
            if key == "id" || key == "_id" {
                let raw = access.next_value::<String>()?;
                let parsed = EntityId::new(raw).map_err(de::Error::custom)?;
                if let Some(existing) = &id {
                    if existing != &parsed {
                        return Err(de::Error::custom(format!(
                            "conflicting ids `{existing}` and `{parsed}`"
                        )));
                    }
                }
                id = Some(parsed);
            } else {
                fields.insert(key, access.next_value::<Value>()?);
            }
        }

        let id = id.ok_or_else(|| de::Error::missing_field("id"))?;
        Ok(Record { id, fields })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_id_and_mongo_style_id() {
        let record: Record = serde_json::from_value(json!({"id": "1", "title": "A"})).unwrap();
        assert_eq!(record.id().as_str(), "1");
        assert_eq!(record.get("title"), Some(&json!("A")));

        let record: Record = serde_json::from_value(json!({"_id": "2", "done": true})).unwrap();
        assert_eq!(record.id().as_str(), "2");
        assert!(record.get("_id").is_none());
    }

    #[test]
    fn rejects_missing_or_blank_id() {
        assert!(serde_json::from_value::<Record>(json!({"title": "A"})).is_err());
        assert!(serde_json::from_value::<Record>(json!({"id": " "})).is_err());
        assert!(serde_json::from_value::<Record>(json!({"id": "1", "_id": "2"})).is_err());
    }

    #[test]
    fn merge_overwrites_patch_fields_and_keeps_id() {
        let mut record = Record::from_value(json!({"id": "1", "a": 1, "b": 2})).unwrap();
        let patch = json!({"a": 9, "id": "other"});
        let Value::Object(patch) = patch else {
            unreachable!()
        };
        record.merge(patch);
        assert_eq!(record.to_value(), json!({"id": "1", "a": 9, "b": 2}));
    }

    #[test]
    fn revision_prefers_updated_at() {
        let record = Record::from_value(json!({
            "id": "1",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-02-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            record.revision().map(|revision| revision.to_rfc3339()),
            Some("2024-02-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn serializes_flat_with_id_first() {
        let record = Record::from_value(json!({"_id": "7", "title": "x"})).unwrap();
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"id":"7","title":"x"}"#
        );
    }
}
