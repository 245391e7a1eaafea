//! Capability checks.
//!
//! The engine never decides authorization policy itself. Every read and write
//! asks a [`PermissionChecker`] whether an [`Actor`] holds at least a given
//! [`AclLevel`] on an object, and treats the answer as fixed for the duration
//! of one operation.

use crate::model::{Actor, ActorId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AclLevel {
    #[default]
    Nothing,
    Readable,
    Writable,
    Full,
}

/// Default visibility carried by every permission-bearing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclInfo {
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub default_permission: AclLevel,
}

fn default_public() -> bool {
    true
}

impl Default for AclInfo {
    fn default() -> Self {
        Self {
            is_public: true,
            default_permission: AclLevel::Nothing,
        }
    }
}

impl AclInfo {
    pub fn private() -> Self {
        Self {
            is_public: false,
            default_permission: AclLevel::Nothing,
        }
    }

    /// Readability derived from default visibility alone, without an actor.
    pub fn is_readable_by_default(&self) -> bool {
        self.is_public || self.default_permission >= AclLevel::Readable
    }
}

/// The object a capability check is asked about.
#[derive(Debug, Clone, Copy)]
pub struct AclTarget<'a> {
    pub object_id: u64,
    pub acl: &'a AclInfo,
}

impl<'a> AclTarget<'a> {
    pub fn new(object_id: impl Into<u64>, acl: &'a AclInfo) -> Self {
        Self {
            object_id: object_id.into(),
            acl,
        }
    }
}

pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, actor: &Actor, target: AclTarget<'_>, level: AclLevel) -> bool;
}

/// Grants everything. Used where authorization happens outside the catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn has_permission(&self, _actor: &Actor, _target: AclTarget<'_>, _level: AclLevel) -> bool {
        true
    }
}

/// Explicit per-actor grants layered over default visibility.
///
/// Resolution: superusers pass, then an explicit grant decides, then public
/// objects pass, then the object's default permission decides.
#[derive(Debug, Default)]
pub struct AclTable {
    grants: RwLock<HashMap<(ActorId, u64), AclLevel>>,
}

impl AclTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, actor: ActorId, object_id: impl Into<u64>, level: AclLevel) {
        if let Ok(mut grants) = self.grants.write() {
            grants.insert((actor, object_id.into()), level);
        }
    }

    pub fn revoke(&self, actor: ActorId, object_id: impl Into<u64>) {
        if let Ok(mut grants) = self.grants.write() {
            grants.remove(&(actor, object_id.into()));
        }
    }
}

impl PermissionChecker for AclTable {
    fn has_permission(&self, actor: &Actor, target: AclTarget<'_>, level: AclLevel) -> bool {
        if actor.is_superuser {
            return true;
        }
        let explicit = self
            .grants
            .read()
            .ok()
            .and_then(|grants| grants.get(&(actor.id, target.object_id)).copied());
        if let Some(granted) = explicit {
            return granted >= level;
        }
        if target.acl.is_public {
            return true;
        }
        target.acl.default_permission >= level
    }
}
