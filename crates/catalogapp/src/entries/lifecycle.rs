//! Soft delete, restore and purge.
//!
//! A soft-deleted entry keeps its attributes and values. Its name gets a
//! `_deleted_<timestamp>` suffix so the original name is free for reuse, and
//! restore strips it again.

use crate::acl::AclLevel;
use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{deleted_name, Actor, Entry, EntryId, EntryStatus};
use crate::store::StorageBackend;
use chrono::Utc;
use tracing::info;

impl<B: StorageBackend> Catalog<B> {
    /// Soft-delete an active entry and cascade through its attributes.
    pub fn soft_delete(&self, entry_id: EntryId, actor: &Actor) -> Result<Entry> {
        let entry = self.entry_or_err(entry_id)?;
        if !entry.is_active {
            return Err(CatalogError::validation("specified entry has already been deleted"));
        }
        self.require(actor, entry.id, &entry.acl, AclLevel::Full, "deleting an entry")?;
        self.delete_entry_cascade(&entry, actor)?;
        self.entry_or_err(entry_id)
    }

    /// Restore a soft-deleted entry, refusing when it or anything its chained
    /// references would bring back collides with an active name.
    pub fn restore(&self, entry_id: EntryId, actor: &Actor) -> Result<Entry> {
        let entry = self.entry_or_err(entry_id)?;
        if entry.is_active {
            return Err(CatalogError::validation("specified entry has not deleted"));
        }
        self.require(actor, entry.id, &entry.acl, AclLevel::Full, "restoring an entry")?;

        if self
            .find_active_entry(entry.entity_id, &entry.base_name())?
            .is_some()
        {
            return Err(CatalogError::validation(format!(
                "specified entry already exist other: {}",
                entry.base_name()
            )));
        }
        let mut chain = vec![entry.id];
        if self.entry_restore_collision(&entry, &mut chain)? {
            return Err(CatalogError::validation(
                "a referenced entry would collide with an existing entry",
            ));
        }

        self.restore_entry_cascade(&entry, actor)?;
        self.entry_or_err(entry_id)
    }

    /// Remove a soft-deleted entry with its history. Not reversible.
    pub fn purge_entry(&self, entry_id: EntryId, actor: &Actor) -> Result<()> {
        let entry = self.entry_or_err(entry_id)?;
        if entry.is_active {
            return Err(CatalogError::validation("only deleted entries can be purged"));
        }
        self.require(actor, entry.id, &entry.acl, AclLevel::Full, "purging an entry")?;
        self.store().destroy_entry(entry.id)?;
        self.unpublish_entry(entry.id);
        info!(entry = %entry.id, name = %entry.name, "entry purged");
        Ok(())
    }

    pub(crate) fn delete_entry_cascade(&self, entry: &Entry, actor: &Actor) -> Result<()> {
        let referrers = self.live_referrers(entry.id)?;

        let mut entry = self.entry_or_err(entry.id)?;
        let now = Utc::now();
        entry.is_active = false;
        entry.name = deleted_name(&entry.name, now);
        entry.deleted_by = Some(actor.id);
        entry.deleted_at = Some(now);
        entry.updated_at = now;
        self.store().update_entry(&entry)?;

        for id in entry.attrs.clone() {
            if let Some(attr) = self.store().attribute(id)? {
                if attr.is_active {
                    self.delete_cascade(&attr, actor)?;
                }
            }
        }

        for referrer in &referrers {
            self.publish_entry(referrer);
        }
        self.unpublish_entry(entry.id);
        info!(entry = %entry.id, name = %entry.name, actor = %actor.name, "entry deleted");
        Ok(())
    }

    pub(crate) fn restore_entry_cascade(&self, entry: &Entry, actor: &Actor) -> Result<()> {
        let mut entry = self.entry_or_err(entry.id)?;
        entry.is_active = true;
        entry.name = entry.base_name();
        entry.deleted_by = None;
        entry.deleted_at = None;
        entry.updated_at = Utc::now();
        entry.status.insert(EntryStatus::CREATING);
        self.store().update_entry(&entry)?;

        for attr in self.restorable_attributes(&entry)? {
            self.restore_cascade(&attr, actor)?;
        }

        let entry = self.set_status(entry.id, EntryStatus::CREATING, false)?;
        for referrer in self.live_referrers(entry.id)? {
            self.publish_entry(&referrer);
        }
        self.publish_entry(&entry);
        info!(entry = %entry.id, name = %entry.name, actor = %actor.name, "entry restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::acl::{AclInfo, AclLevel, AclTable};
    use crate::catalog::Catalog;
    use crate::model::{strip_deleted_suffix, Actor, ActorId};
    use crate::search::ENTRY_DOC_TYPE;
    use crate::store::{MemBackend, StorageBackend};
    use crate::test_utils::Fixture;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn delete_renames_and_records_actor() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"hostname": "web"}));
        let deleted = fx.catalog.soft_delete(server.id, &fx.admin).unwrap();
        assert!(!deleted.is_active);
        assert_ne!(deleted.name, "web-01");
        assert_eq!(strip_deleted_suffix(&deleted.name), "web-01");
        assert_eq!(deleted.deleted_by, Some(fx.admin.id));
        assert!(fx
            .store()
            .attributes_of(server.id)
            .unwrap()
            .iter()
            .all(|a| !a.is_active));

        assert!(fx.catalog.soft_delete(server.id, &fx.admin).unwrap_err().is_validation());
    }

    #[test]
    fn delete_then_restore_round_trips() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"hostname": "web"}));
        fx.catalog.soft_delete(server.id, &fx.admin).unwrap();
        let restored = fx.catalog.restore(server.id, &fx.admin).unwrap();
        assert!(restored.is_active);
        assert_eq!(restored.name, "web-01");
        assert!(restored.deleted_at.is_none());
        assert!(restored.status.is_empty());
        assert_eq!(fx.value_of(&server, "hostname"), json!("web"));
        assert!(fx.catalog.restore(server.id, &fx.admin).unwrap_err().is_validation());
    }

    #[test]
    fn restore_refused_when_name_taken() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({}));
        fx.catalog.soft_delete(server.id, &fx.admin).unwrap();
        fx.create("Server", "web-01", json!({}));
        let err = fx.catalog.restore(server.id, &fx.admin).unwrap_err();
        assert!(err.is_validation());
        assert!(!fx.entry(&server).is_active);
    }

    #[test]
    fn superseded_attributes_stay_retired() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({}));
        let original = fx.attr(&server, "hostname");
        let mut duplicate = original.clone();
        duplicate.id = crate::model::AttributeId(fx.store().next_id().unwrap());
        fx.store().insert_attribute(&duplicate).unwrap();
        fx.catalog.dedup_attributes(&fx.entry(&server)).unwrap();

        fx.catalog.soft_delete(server.id, &fx.admin).unwrap();
        fx.catalog.restore(server.id, &fx.admin).unwrap();
        assert!(fx.store_attr(original.id).is_active);
        assert!(!fx.store_attr(duplicate.id).is_active);
    }

    #[test]
    fn delete_requires_full_permission() {
        let acl = Arc::new(AclTable::new());
        let fx = Fixture::with_catalog(Catalog::new(MemBackend::new()).with_permissions(acl.clone()));
        let server = fx.create("Server", "web-01", json!({}));
        let mut entry = fx.entry(&server);
        entry.acl = AclInfo {
            is_public: false,
            default_permission: AclLevel::Writable,
        };
        fx.store().update_entry(&entry).unwrap();

        let guest = Actor::new(ActorId(2), "guest");
        let err = fx.catalog.soft_delete(server.id, &guest).unwrap_err();
        assert!(matches!(err, crate::error::CatalogError::PermissionDenied(_)));
        acl.grant(guest.id, server.id, AclLevel::Full);
        fx.catalog.soft_delete(server.id, &guest).unwrap();
    }

    #[test]
    fn purge_only_deleted_entries() {
        let fx = Fixture::new();
        let net = fx.create("Network", "net-a", json!({}));
        let server = fx.create("Server", "web-01", json!({"uplink": {"name": "eth0", "id": net.id.0}}));
        assert!(fx.catalog.purge_entry(net.id, &fx.admin).unwrap_err().is_validation());

        fx.catalog.soft_delete(net.id, &fx.admin).unwrap();
        fx.catalog.purge_entry(net.id, &fx.admin).unwrap();
        assert!(fx.store().entry(net.id).unwrap().is_none());
        assert_eq!(fx.value_of(&server, "uplink"), json!({"eth0": null}));
    }

    #[test]
    fn delete_drops_document_and_refreshes_referrers() {
        let fx = Fixture::new();
        let net = fx.create("Network", "net-a", json!({}));
        let server = fx.create("Server", "web-01", json!({"uplink": {"name": "eth0", "id": net.id.0}}));
        let doc = fx.catalog.index().get(ENTRY_DOC_TYPE, server.id.0).unwrap().unwrap();
        assert_eq!(doc.referral_ids(), vec![net.id]);

        fx.catalog.soft_delete(net.id, &fx.admin).unwrap();
        assert!(fx.catalog.index().get(ENTRY_DOC_TYPE, net.id.0).unwrap().is_none());
        let doc = fx.catalog.index().get(ENTRY_DOC_TYPE, server.id.0).unwrap().unwrap();
        assert!(doc.referral_ids().is_empty());
    }
}
