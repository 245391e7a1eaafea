//! Records held by the store.
//!
//! Schema records ([`Entity`], [`EntityAttr`], [`Principal`]) are read-only to
//! the engine. Instance records ([`Entry`], [`Attribute`]) are created and
//! soft-deleted by it. Values live in [`crate::values`].

use crate::acl::AclInfo;
use crate::attributes::AttributeKind;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map($name)
            }
        }
    };
}

id_type!(
    /// Schema (entity type) id.
    EntityId
);
id_type!(
    /// Schema attribute id.
    EntityAttrId
);
id_type!(EntryId);
id_type!(AttributeId);
id_type!(ValueId);
id_type!(
    /// Group or role id.
    PrincipalId
);
id_type!(ActorId);

/// The caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    #[serde(default)]
    pub is_superuser: bool,
}

impl Actor {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_superuser: false,
        }
    }

    /// Actor recorded on values the engine creates on its own (self-healing).
    pub fn system() -> Self {
        Self {
            id: ActorId(0),
            name: "system".to_string(),
            is_superuser: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub note: String,
    pub is_active: bool,
    #[serde(default)]
    pub acl: AclInfo,
}

/// A schema attribute: the definition an [`Attribute`] materializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAttr {
    pub id: EntityAttrId,
    pub entity_id: EntityId,
    pub name: String,
    pub kind: AttributeKind,
    #[serde(default)]
    pub is_mandatory: bool,
    /// Propagate soft delete/restore to referenced entries.
    #[serde(default)]
    pub is_delete_in_chain: bool,
    #[serde(default)]
    pub index: i32,
    pub is_active: bool,
    /// Entities an object-kind value may point at. Empty means any.
    #[serde(default)]
    pub referral: Vec<EntityId>,
    #[serde(default)]
    pub acl: AclInfo,
}

impl EntityAttr {
    pub fn cascades(&self) -> bool {
        self.is_delete_in_chain && self.kind.refers_entries()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Group,
    Role,
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKind::Group => write!(f, "group"),
            PrincipalKind::Role => write!(f, "role"),
        }
    }
}

/// A group or role a value can point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub kind: PrincipalKind,
    pub name: String,
    pub is_active: bool,
}

bitflags! {
    /// Transient processing flags on an entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EntryStatus: u32 {
        const CREATING = 1 << 0;
        const EDITING = 1 << 1;
        const COMPLEMENTING_ATTRS = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub entity_id: EntityId,
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub acl: AclInfo,
    /// Materialized attributes in link order.
    #[serde(default)]
    pub attrs: Vec<AttributeId>,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_by: Option<ActorId>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn new(id: EntryId, entity_id: EntityId, name: impl Into<String>, actor: &Actor) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_id,
            name: name.into(),
            is_active: true,
            status: EntryStatus::empty(),
            acl: AclInfo::default(),
            attrs: Vec::new(),
            created_by: actor.id,
            created_at: now,
            updated_at: now,
            deleted_by: None,
            deleted_at: None,
        }
    }

    /// Name with any soft-delete suffix removed.
    pub fn base_name(&self) -> String {
        strip_deleted_suffix(&self.name)
    }
}

/// Binding of one schema attribute to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub entry_id: EntryId,
    pub schema_id: EntityAttrId,
    pub name: String,
    pub is_active: bool,
    /// Retired by the duplicate-materialization repair; never restored.
    #[serde(default)]
    pub superseded: bool,
    #[serde(default)]
    pub acl: AclInfo,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
}

static DELETED_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_deleted_[0-9_]*$").expect("valid regex"));

/// Collision-avoiding name given to a soft-deleted record.
pub fn deleted_name(name: &str, at: DateTime<Utc>) -> String {
    format!("{}_deleted_{}", name, at.format("%Y%m%d_%H%M%S_%6f"))
}

pub fn strip_deleted_suffix(name: &str) -> String {
    DELETED_SUFFIX.replace(name, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deleted_name_round_trips_through_strip() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 6).unwrap();
        let name = deleted_name("server-01", at);
        assert_eq!(name, "server-01_deleted_20240309_140506_000000");
        assert_eq!(strip_deleted_suffix(&name), "server-01");
    }

    #[test]
    fn strip_leaves_plain_names_alone() {
        assert_eq!(strip_deleted_suffix("db_deleted"), "db_deleted");
        assert_eq!(strip_deleted_suffix("host_2024"), "host_2024");
        assert_eq!(strip_deleted_suffix("a_deleted_1_deleted_2"), "a_deleted_1");
    }

    #[test]
    fn ids_parse_and_display() {
        let id: EntryId = " 42 ".parse().unwrap();
        assert_eq!(id, EntryId(42));
        assert_eq!(id.to_string(), "42");
        assert!("x1".parse::<EntryId>().is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }

    #[test]
    fn entry_status_flags_compose() {
        let mut entry = Entry::new(EntryId(1), EntityId(2), "e", &Actor::new(ActorId(3), "u"));
        entry.status.insert(EntryStatus::CREATING | EntryStatus::EDITING);
        entry.status.remove(EntryStatus::CREATING);
        assert_eq!(entry.status, EntryStatus::EDITING);
    }
}
