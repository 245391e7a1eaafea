//! # Value Store
//!
//! A [`Value`] is one immutable version of an attribute's content. Writes never
//! edit content in place: they append a new value and move the `latest` flag.
//! The only in-place mutations are the `latest` flag and the status bits.
//!
//! ## Shapes
//!
//! - Scalar kinds store one value whose payload fields follow the pinned kind.
//! - Array kinds store a container value (status `ARRAY_CONTAINER`) whose
//!   `children` list points at child values. Children carry the element kind,
//!   point back through `parent_value`, and never carry `latest`.
//!
//! ## Payload Encoding
//!
//! | Kind | `text` | `boolean` | `date` | `referral` |
//! |------|--------|-----------|--------|------------|
//! | string, text | content | | | |
//! | boolean | | content | | |
//! | date | | | content | |
//! | object | | | | entry id |
//! | named object | key | | | entry id |
//! | group, role | canonical id | | | |
//!
//! The pinned `kind` is the attribute's kind at creation time. Decoding always
//! follows it, never the schema's current kind.
//!
//! ## Operations
//!
//! - [`Value::create`] / [`Value::clone_with`]: construction
//! - [`render`]: decode into [`crate::attributes::AttrValue`]
//! - [`normalize`]: canonicalize group/role and entry references
//! - [`validate`]: per-kind checks, reported as a [`Verdict`]

pub mod normalize;
pub mod render;
pub mod validate;

pub use normalize::{normalize_for_storage, parse_entry_ref, parse_named, principal_kind};
pub use render::{render, render_json, RenderOptions};
pub use validate::{validate, Verdict};

use crate::attributes::AttributeKind;
use crate::model::{Actor, ActorId, AttributeId, EntryId, ValueId};
use bitflags::bitflags;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ValueStatus: u32 {
        const ARRAY_CONTAINER = 1 << 0;
    }
}

/// Content fields of a value, as produced by the write-path encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub text: String,
    pub boolean: bool,
    pub date: Option<NaiveDate>,
    pub referral: Option<EntryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub id: ValueId,
    pub attribute_id: AttributeId,
    /// Kind at creation time.
    pub kind: AttributeKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub boolean: bool,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Weak reference; cleared when the referent is destroyed.
    #[serde(default)]
    pub referral: Option<EntryId>,
    #[serde(default)]
    pub children: Vec<ValueId>,
    #[serde(default)]
    pub parent_value: Option<ValueId>,
    pub is_latest: bool,
    #[serde(default)]
    pub status: ValueStatus,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
}

/// Fields a clone may take from the caller instead of the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneOverrides {
    pub attribute_id: Option<AttributeId>,
    pub parent_value: Option<ValueId>,
}

impl Value {
    /// A new, not-yet-latest value. Array kinds become containers.
    pub fn create(
        id: ValueId,
        attribute_id: AttributeId,
        kind: AttributeKind,
        payload: Payload,
        actor: &Actor,
    ) -> Self {
        let status = if kind.is_array() {
            ValueStatus::ARRAY_CONTAINER
        } else {
            ValueStatus::empty()
        };
        Self {
            id,
            attribute_id,
            kind,
            text: payload.text,
            boolean: payload.boolean,
            date: payload.date,
            referral: payload.referral,
            children: Vec::new(),
            parent_value: None,
            is_latest: false,
            status,
            created_by: actor.id,
            created_at: Utc::now(),
        }
    }

    /// Same content under a new identity, actor and time. Child links are not
    /// inherited and the copy is not latest.
    pub fn clone_with(&self, id: ValueId, overrides: CloneOverrides, actor: &Actor) -> Self {
        Self {
            id,
            attribute_id: overrides.attribute_id.unwrap_or(self.attribute_id),
            kind: self.kind,
            text: self.text.clone(),
            boolean: self.boolean,
            date: self.date,
            referral: self.referral,
            children: Vec::new(),
            parent_value: overrides.parent_value.or(self.parent_value),
            is_latest: false,
            status: self.status,
            created_by: actor.id,
            created_at: Utc::now(),
        }
    }

    pub fn with_parent(mut self, parent: ValueId) -> Self {
        self.parent_value = Some(parent);
        self
    }

    pub fn is_container(&self) -> bool {
        self.status.contains(ValueStatus::ARRAY_CONTAINER)
    }

    pub fn is_child(&self) -> bool {
        self.parent_value.is_some()
    }

    pub fn payload(&self) -> Payload {
        Payload {
            text: self.text.clone(),
            boolean: self.boolean,
            date: self.date,
            referral: self.referral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor::new(ActorId(1), "alice")
    }

    #[test]
    fn create_pins_kind_and_marks_containers() {
        let scalar = Value::create(
            ValueId(10),
            AttributeId(2),
            AttributeKind::STRING,
            Payload {
                text: "web".into(),
                ..Default::default()
            },
            &actor(),
        );
        assert_eq!(scalar.kind, AttributeKind::STRING);
        assert!(!scalar.is_container());
        assert!(!scalar.is_latest);

        let container = Value::create(
            ValueId(11),
            AttributeId(2),
            AttributeKind::ARRAY_STRING,
            Payload::default(),
            &actor(),
        );
        assert!(container.is_container());
    }

    #[test]
    fn clone_drops_children_and_latest() {
        let mut source = Value::create(
            ValueId(11),
            AttributeId(2),
            AttributeKind::ARRAY_OBJECT,
            Payload::default(),
            &actor(),
        );
        source.children = vec![ValueId(12), ValueId(13)];
        source.is_latest = true;

        let other = Actor::new(ActorId(9), "bob");
        let copy = source.clone_with(
            ValueId(20),
            CloneOverrides {
                attribute_id: Some(AttributeId(5)),
                ..Default::default()
            },
            &other,
        );
        assert_eq!(copy.id, ValueId(20));
        assert_eq!(copy.attribute_id, AttributeId(5));
        assert!(copy.children.is_empty());
        assert!(!copy.is_latest);
        assert!(copy.is_container());
        assert_eq!(copy.created_by, ActorId(9));
    }

    #[test]
    fn clone_keeps_content() {
        let source = Value::create(
            ValueId(1),
            AttributeId(2),
            AttributeKind::NAMED_OBJECT,
            Payload {
                text: "uplink".into(),
                referral: Some(EntryId(7)),
                ..Default::default()
            },
            &actor(),
        );
        let copy = source.clone_with(ValueId(3), CloneOverrides::default(), &actor());
        assert_eq!(copy.payload(), source.payload());
    }
}
