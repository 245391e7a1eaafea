use crate::catalog::Catalog;
use crate::error::Result;
use crate::model::{Actor, Attribute, EntityAttr, Entry, EntryId};
use crate::store::StorageBackend;
use tracing::debug;

impl<B: StorageBackend> Catalog<B> {
    /// Entries the attribute's latest value points at, children included.
    pub(crate) fn referenced_entries(&self, attr: &Attribute, schema: &EntityAttr) -> Result<Vec<EntryId>> {
        let Some(latest) = self.latest_value_for(attr, schema, true)? else {
            return Ok(Vec::new());
        };
        if !latest.is_container() {
            return Ok(latest.referral.into_iter().collect());
        }
        Ok(self
            .store()
            .children_of(latest.id)?
            .into_iter()
            .filter_map(|child| child.referral)
            .collect())
    }

    /// Soft-delete an attribute. Chained reference attributes also delete
    /// each referenced live entry that no longer has any live referrer.
    pub fn delete_cascade(&self, attr: &Attribute, actor: &Actor) -> Result<()> {
        let mut attr = attr.clone();
        attr.is_active = false;
        self.store().update_attribute(&attr)?;

        let schema = self.schema_attr_or_err(attr.schema_id)?;
        if !schema.cascades() {
            return Ok(());
        }
        for id in self.referenced_entries(&attr, &schema)? {
            let Some(target) = self.store().entry(id)? else {
                continue;
            };
            if !target.is_active {
                continue;
            }
            if !self.live_referrers(target.id)?.is_empty() {
                debug!(entry = %target.id, "chained delete skipped, still referenced");
                continue;
            }
            self.delete_entry_cascade(&target, actor)?;
        }
        Ok(())
    }

    /// Restore a soft-deleted attribute. Chained reference attributes also
    /// restore each referenced entry that is soft-deleted.
    pub fn restore_cascade(&self, attr: &Attribute, actor: &Actor) -> Result<()> {
        let mut attr = attr.clone();
        attr.is_active = true;
        self.store().update_attribute(&attr)?;

        let schema = self.schema_attr_or_err(attr.schema_id)?;
        if !schema.cascades() {
            return Ok(());
        }
        for id in self.referenced_entries(&attr, &schema)? {
            if let Some(target) = self.store().entry(id)? {
                if !target.is_active {
                    self.restore_entry_cascade(&target, actor)?;
                }
            }
        }
        Ok(())
    }

    /// Whether restoring this attribute would bring back an entry whose name
    /// is already taken by an active entry of the same schema.
    ///
    /// `chain` collects the entries visited so far. An entry already in the
    /// chain counts as safe and is not walked again, which guarantees
    /// termination on reference cycles.
    pub fn detect_restore_collision(&self, attr: &Attribute, chain: &mut Vec<EntryId>) -> Result<bool> {
        let schema = self.schema_attr_or_err(attr.schema_id)?;
        if !schema.cascades() {
            return Ok(false);
        }
        for id in self.referenced_entries(attr, &schema)? {
            let Some(target) = self.store().entry(id)? else {
                continue;
            };
            if target.is_active || chain.contains(&target.id) {
                continue;
            }
            if self
                .find_active_entry(target.entity_id, &target.base_name())?
                .is_some()
            {
                return Ok(true);
            }
            chain.push(target.id);
            if self.entry_restore_collision(&target, chain)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// [`Catalog::detect_restore_collision`] over every restorable attribute
    /// of `entry`.
    pub(crate) fn entry_restore_collision(&self, entry: &Entry, chain: &mut Vec<EntryId>) -> Result<bool> {
        for attr in self.restorable_attributes(entry)? {
            if self.detect_restore_collision(&attr, chain)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Inactive linked attributes that were not retired as duplicates.
    pub(crate) fn restorable_attributes(&self, entry: &Entry) -> Result<Vec<Attribute>> {
        let mut attrs = Vec::new();
        for id in &entry.attrs {
            if let Some(attr) = self.store().attribute(*id)? {
                if !attr.is_active && !attr.superseded {
                    attrs.push(attr);
                }
            }
        }
        Ok(attrs)
    }
}
