//! Typed attribute values.
//!
//! [`AttrValue`] is what the value store decodes a stored version into. It has
//! three JSON faces:
//!
//! - [`AttrValue::to_plain`]: the snapshot form, optionally carrying referent ids
//! - [`AttrValue::to_input`]: the canonical writable form accepted by `write`
//! - [`AttrValue::to_export`]: the name-only form used by export

use super::kind::{AttributeKind, BaseKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A resolved pointer to an entry, group or role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referent {
    pub id: u64,
    pub name: String,
}

impl Referent {
    pub fn new(id: impl Into<u64>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Free-text key with an optional reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub key: String,
    pub referent: Option<Referent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// String and text kinds.
    Text(String),
    Bool(bool),
    Date(Option<NaiveDate>),
    /// Object, group and role kinds.
    Ref(Option<Referent>),
    Named(NamedRef),
    /// Array kinds; elements carry the element kind's variant.
    List(Vec<AttrValue>),
}

/// Structural zero value of a kind.
pub fn default_value(kind: AttributeKind) -> AttrValue {
    if kind.is_array() {
        return AttrValue::List(Vec::new());
    }
    if kind.is_named() {
        return AttrValue::Named(NamedRef {
            key: String::new(),
            referent: None,
        });
    }
    match kind.base_kind() {
        BaseKind::String | BaseKind::Text => AttrValue::Text(String::new()),
        BaseKind::Boolean => AttrValue::Bool(false),
        BaseKind::Date => AttrValue::Date(None),
        BaseKind::Object | BaseKind::Group | BaseKind::Role => AttrValue::Ref(None),
    }
}

impl AttrValue {
    pub fn is_empty(&self) -> bool {
        match self {
            AttrValue::Text(s) => s.is_empty(),
            AttrValue::Bool(_) => false,
            AttrValue::Date(d) => d.is_none(),
            AttrValue::Ref(r) => r.is_none(),
            AttrValue::Named(n) => n.key.is_empty() && n.referent.is_none(),
            AttrValue::List(items) => items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_referent(&self) -> Option<&Referent> {
        match self {
            AttrValue::Ref(r) => r.as_ref(),
            AttrValue::Named(n) => n.referent.as_ref(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Snapshot form. With metadata, references render as `{"id", "name"}`;
    /// without, as the referent name.
    pub fn to_plain(&self, with_metadata: bool) -> Json {
        let referent = |r: &Option<Referent>| match r {
            Some(r) if with_metadata => json!({"id": r.id, "name": r.name}),
            Some(r) => Json::String(r.name.clone()),
            None => Json::Null,
        };
        match self {
            AttrValue::Text(s) => Json::String(s.clone()),
            AttrValue::Bool(b) => Json::Bool(*b),
            AttrValue::Date(d) => date_json(d),
            AttrValue::Ref(r) => referent(r),
            AttrValue::Named(n) => {
                let mut map = Map::new();
                map.insert(n.key.clone(), referent(&n.referent));
                Json::Object(map)
            }
            AttrValue::List(items) => {
                Json::Array(items.iter().map(|i| i.to_plain(with_metadata)).collect())
            }
        }
    }

    /// Canonical writable form: ids for references, `{"name", "id"}` for named pairs.
    pub fn to_input(&self) -> Json {
        match self {
            AttrValue::Text(s) => Json::String(s.clone()),
            AttrValue::Bool(b) => Json::Bool(*b),
            AttrValue::Date(d) => date_json(d),
            AttrValue::Ref(r) => r.as_ref().map_or(Json::Null, |r| json!(r.id)),
            AttrValue::Named(n) => json!({
                "name": n.key,
                "id": n.referent.as_ref().map(|r| r.id),
            }),
            AttrValue::List(items) => Json::Array(items.iter().map(|i| i.to_input()).collect()),
        }
    }

    /// Export form: referent names only, named pairs as `{key: name}`.
    pub fn to_export(&self) -> Json {
        self.to_plain(false)
    }
}

fn date_json(date: &Option<NaiveDate>) -> Json {
    match date {
        Some(d) => Json::String(d.format(DATE_FORMAT).to_string()),
        None => Json::Null,
    }
}
