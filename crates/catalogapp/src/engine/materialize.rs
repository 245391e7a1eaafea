use super::lock::LockKey;
use crate::acl::AclInfo;
use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{Actor, Attribute, AttributeId, EntityAttr, EntityAttrId, Entry};
use crate::store::StorageBackend;
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::debug;

impl<B: StorageBackend> Catalog<B> {
    /// The surviving active attribute of `entry` for `schema`, if materialized.
    ///
    /// When duplicates exist the pick matches the one [`Catalog::dedup_attributes`]
    /// would keep for this snapshot.
    pub fn active_attribute(&self, entry: &Entry, schema: EntityAttrId) -> Result<Option<Attribute>> {
        let candidates: Vec<Attribute> = self
            .store()
            .attributes_of(entry.id)?
            .into_iter()
            .filter(|a| a.is_active && a.schema_id == schema)
            .collect();
        Ok(pick_winner(entry, &entry.attrs, candidates))
    }

    /// Idempotent materialization of the attribute binding `schema` to `entry`.
    pub fn ensure_attribute(&self, entry: &Entry, schema: &EntityAttr, actor: &Actor) -> Result<Attribute> {
        if let Some(found) = self.active_attribute(entry, schema.id)? {
            return Ok(found);
        }

        let guard = self.locks.acquire(LockKey::attribute(entry.id, schema.id));

        let current = self.entry_or_err(entry.id)?;
        if let Some(found) = self.active_attribute(&current, schema.id)? {
            return Ok(found);
        }

        let attr = Attribute {
            id: AttributeId(self.next_id()?),
            entry_id: entry.id,
            schema_id: schema.id,
            name: schema.name.clone(),
            is_active: true,
            superseded: false,
            acl: AclInfo::default(),
            created_by: actor.id,
            created_at: Utc::now(),
        };
        self.store().insert_attribute(&attr)?;
        debug!(entry = %entry.id, attr = %attr.id, name = %attr.name, "attribute materialized");
        drop(guard);

        self.dedup_attributes(entry)?;
        let current = self.entry_or_err(entry.id)?;
        self.active_attribute(&current, schema.id)?
            .ok_or(CatalogError::AttributeNotFound(attr.id))
    }

    /// Deactivate all but one active attribute per schema attribute.
    ///
    /// The survivor is the duplicate already linked in `snapshot`; failing
    /// that, the one linked earliest on the stored entry, then the lowest id.
    /// Losers are marked superseded and unlinked. Returns how many were
    /// retired; running it with no duplicates present is a no-op.
    pub fn dedup_attributes(&self, snapshot: &Entry) -> Result<usize> {
        let current = self.entry_or_err(snapshot.id)?;
        let mut groups: BTreeMap<EntityAttrId, Vec<Attribute>> = BTreeMap::new();
        for attr in self.store().attributes_of(snapshot.id)? {
            if attr.is_active {
                groups.entry(attr.schema_id).or_default().push(attr);
            }
        }

        let mut retired = 0;
        for (_, group) in groups {
            if group.len() < 2 {
                continue;
            }
            let Some(winner) = pick_winner(snapshot, &current.attrs, group.clone()) else {
                continue;
            };
            for mut loser in group.into_iter().filter(|a| a.id != winner.id) {
                loser.is_active = false;
                loser.superseded = true;
                self.store().update_attribute(&loser)?;
                self.store().unlink_attribute(snapshot.id, loser.id)?;
                debug!(entry = %snapshot.id, kept = %winner.id, retired = %loser.id, "duplicate attribute retired");
                retired += 1;
            }
        }
        Ok(retired)
    }
}

fn pick_winner(snapshot: &Entry, linked: &[AttributeId], candidates: Vec<Attribute>) -> Option<Attribute> {
    if let Some(found) = candidates.iter().find(|a| snapshot.attrs.contains(&a.id)) {
        return Some(found.clone());
    }
    candidates.into_iter().min_by_key(|a| {
        let position = linked.iter().position(|id| *id == a.id).unwrap_or(usize::MAX);
        (position, a.id)
    })
}
