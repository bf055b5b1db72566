//! The entity/relationship graph stored (as JSON) on every annotation.
//!
//! A graph is four id-keyed collections: named entities, the groups entities
//! belong to, the text spans where entities occur (locations), and ties
//! (typed, optionally weighted and directed relations between entities or
//! spans). Ids are strings; numeric ids found in older rows are read as their
//! decimal string.

use std::collections::BTreeMap;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

const DELETE_MARKER: &str = "DELETE";

const ENTITY_FIELDS: &[&str] = &["name", "group_id"];
const GROUP_FIELDS: &[&str] = &["name"];
const LOCATION_FIELDS: &[&str] = &["start", "end", "entity_id"];
const TIE_FIELDS: &[&str] = &[
    "start",
    "end",
    "source_entity",
    "target_entity",
    "label",
    "weight",
    "directed",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_entity_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_group_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tie_id: Option<i64>,
    #[serde(default, deserialize_with = "object_or_list")]
    pub entities: BTreeMap<String, Entity>,
    #[serde(default, deserialize_with = "object_or_list")]
    pub groups: BTreeMap<String, Group>,
    #[serde(default, deserialize_with = "object_or_list")]
    pub locations: BTreeMap<String, Location>,
    #[serde(default, deserialize_with = "object_or_list")]
    pub ties: BTreeMap<String, Tie>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A token span `[start, end]` in the text where an entity is mentioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub start: i64,
    pub end: i64,
    #[serde(
        default,
        deserialize_with = "optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub entity_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tie {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(default)]
    pub source_entity: TieEndpoint,
    #[serde(default)]
    pub target_entity: TieEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Kept as the number the client sent, so an integer weight stays one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directed: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One end of a tie: either a specific location or an entity as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieEndpoint {
    #[serde(
        default,
        deserialize_with = "optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub entity_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A partial update to a graph, as sent by the annotation editor.
///
/// Counters replace the stored value. Each collection entry is either the
/// string `"DELETE"` or an object whose recognised fields are merged into the
/// existing entry (or a new one).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphPatch {
    #[serde(default)]
    pub last_entity_id: Option<i64>,
    #[serde(default)]
    pub last_group_id: Option<i64>,
    #[serde(default)]
    pub last_tie_id: Option<i64>,
    #[serde(default)]
    pub entities: BTreeMap<String, Value>,
    #[serde(default)]
    pub groups: BTreeMap<String, Value>,
    #[serde(default)]
    pub locations: BTreeMap<String, Value>,
    #[serde(default)]
    pub ties: BTreeMap<String, Value>,
}

impl AnnotationGraph {
    /// The graph a freshly uploaded text starts with: no entities, counters at zero.
    #[must_use]
    pub fn blank_slate() -> Self {
        Self {
            last_entity_id: Some(0),
            last_group_id: Some(0),
            last_tie_id: Some(0),
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Applies an editor patch in place. Fails without partial effects on a
    /// collection if an entry is malformed.
    pub fn apply_patch(&mut self, patch: &GraphPatch) -> Result<()> {
        let mut next = self.clone();

        if let Some(id) = patch.last_entity_id {
            next.last_entity_id = Some(id);
        }
        if let Some(id) = patch.last_group_id {
            next.last_group_id = Some(id);
        }
        if let Some(id) = patch.last_tie_id {
            next.last_tie_id = Some(id);
        }

        merge_entries(&mut next.entities, &patch.entities, ENTITY_FIELDS, "entity")?;
        merge_entries(&mut next.groups, &patch.groups, GROUP_FIELDS, "group")?;
        merge_entries(&mut next.locations, &patch.locations, LOCATION_FIELDS, "location")?;
        merge_entries(&mut next.ties, &patch.ties, TIE_FIELDS, "tie")?;

        *self = next;
        Ok(())
    }
}

fn merge_entries<T>(
    target: &mut BTreeMap<String, T>,
    changes: &BTreeMap<String, Value>,
    allowed: &[&str],
    kind: &str,
) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    for (id, change) in changes {
        match change {
            Value::String(s) if s == DELETE_MARKER => {
                target.remove(id);
            }
            Value::Object(fields) => {
                let mut merged = match target.get(id) {
                    Some(existing) => match serde_json::to_value(existing)? {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    },
                    None => Map::new(),
                };
                for field in allowed {
                    if let Some(value) = fields.get(*field) {
                        merged.insert((*field).to_string(), value.clone());
                    }
                }
                let entry: T = serde_json::from_value(Value::Object(merged)).map_err(|e| {
                    Error::BadRequest(format!("invalid {kind} '{id}': {e}"))
                })?;
                target.insert(id.clone(), entry);
            }
            other => {
                return Err(Error::BadRequest(format!(
                    "invalid {kind} '{id}': expected an object or \"{DELETE_MARKER}\", got {other}"
                )));
            }
        }
    }
    Ok(())
}

/// Collections are objects keyed by id, but rows written by older clients
/// may hold an empty (or index-keyed) JSON array instead.
fn object_or_list<'de, D, T>(deserializer: D) -> std::result::Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr<T> {
        Object(BTreeMap<String, T>),
        List(Vec<T>),
    }

    match Option::<Repr<T>>::deserialize(deserializer)? {
        Some(Repr::Object(map)) => Ok(map),
        Some(Repr::List(items)) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect()),
        None => Ok(BTreeMap::new()),
    }
}

fn optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or numeric id, got {other}"
        ))),
    }
}
