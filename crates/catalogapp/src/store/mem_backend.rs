use super::backend::StorageBackend;
use crate::error::{CatalogError, Result};
use crate::model::{
    Actor, ActorId, Attribute, AttributeId, Entity, EntityAttr, EntityAttrId, EntityId, Entry,
    EntryId, Principal, PrincipalId, PrincipalKind, ValueId,
};
use crate::values::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Every table of the store. Also the on-disk snapshot format.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Tables {
    pub next_id: u64,
    pub entities: BTreeMap<EntityId, Entity>,
    pub entity_attrs: BTreeMap<EntityAttrId, EntityAttr>,
    pub principals: BTreeMap<PrincipalId, Principal>,
    pub actors: BTreeMap<ActorId, Actor>,
    pub entries: BTreeMap<EntryId, Entry>,
    pub attributes: BTreeMap<AttributeId, Attribute>,
    pub values: BTreeMap<ValueId, Value>,
    /// Top-level values per attribute in insertion order.
    #[serde(default)]
    pub attr_values: BTreeMap<AttributeId, Vec<ValueId>>,
}

/// In-memory storage backend.
///
/// Tables sit behind one `RwLock`, so each trait method is a single critical
/// section and the backend can be shared across threads.
#[derive(Default)]
pub struct MemBackend {
    tables: RwLock<Tables>,
    simulate_write_error: AtomicBool,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
            simulate_write_error: AtomicBool::new(false),
        }
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Serialize all tables as one JSON document.
    pub fn to_json(&self) -> Result<String> {
        let tables = self.read()?;
        Ok(serde_json::to_string_pretty(&*tables)?)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| CatalogError::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(CatalogError::Store("Simulated write error".to_string()));
        }
        self.tables
            .write()
            .map_err(|_| CatalogError::Store("store lock poisoned".to_string()))
    }
}

impl StorageBackend for MemBackend {
    fn next_id(&self) -> Result<u64> {
        let mut tables = self.write()?;
        tables.next_id += 1;
        Ok(tables.next_id)
    }

    fn save_entity(&self, entity: &Entity) -> Result<()> {
        self.write()?.entities.insert(entity.id, entity.clone());
        Ok(())
    }

    fn save_entity_attr(&self, attr: &EntityAttr) -> Result<()> {
        self.write()?.entity_attrs.insert(attr.id, attr.clone());
        Ok(())
    }

    fn entity(&self, id: EntityId) -> Result<Option<Entity>> {
        Ok(self.read()?.entities.get(&id).cloned())
    }

    fn entity_by_name(&self, name: &str) -> Result<Option<Entity>> {
        let tables = self.read()?;
        let mut found: Vec<&Entity> = tables.entities.values().filter(|e| e.name == name).collect();
        found.sort_by_key(|e| !e.is_active);
        Ok(found.first().map(|e| (*e).clone()))
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        Ok(self.read()?.entities.values().cloned().collect())
    }

    fn entity_attr(&self, id: EntityAttrId) -> Result<Option<EntityAttr>> {
        Ok(self.read()?.entity_attrs.get(&id).cloned())
    }

    fn entity_attrs(&self, entity: EntityId) -> Result<Vec<EntityAttr>> {
        let tables = self.read()?;
        let mut attrs: Vec<EntityAttr> = tables
            .entity_attrs
            .values()
            .filter(|a| a.entity_id == entity)
            .cloned()
            .collect();
        attrs.sort_by_key(|a| (a.index, a.id));
        Ok(attrs)
    }

    fn save_principal(&self, principal: &Principal) -> Result<()> {
        self.write()?.principals.insert(principal.id, principal.clone());
        Ok(())
    }

    fn principal(&self, kind: PrincipalKind, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self
            .read()?
            .principals
            .get(&id)
            .filter(|p| p.kind == kind)
            .cloned())
    }

    fn principal_by_name(&self, kind: PrincipalKind, name: &str) -> Result<Option<Principal>> {
        let tables = self.read()?;
        let mut found: Vec<&Principal> = tables
            .principals
            .values()
            .filter(|p| p.kind == kind && p.name == name)
            .collect();
        found.sort_by_key(|p| !p.is_active);
        Ok(found.first().map(|p| (*p).clone()))
    }

    fn principals(&self, kind: PrincipalKind) -> Result<Vec<Principal>> {
        Ok(self
            .read()?
            .principals
            .values()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect())
    }

    fn save_actor(&self, actor: &Actor) -> Result<()> {
        self.write()?.actors.insert(actor.id, actor.clone());
        Ok(())
    }

    fn actor(&self, id: ActorId) -> Result<Option<Actor>> {
        Ok(self.read()?.actors.get(&id).cloned())
    }

    fn actor_by_name(&self, name: &str) -> Result<Option<Actor>> {
        Ok(self
            .read()?
            .actors
            .values()
            .find(|a| a.name == name)
            .cloned())
    }

    fn insert_entry(&self, entry: &Entry) -> Result<()> {
        let mut tables = self.write()?;
        if tables.entries.contains_key(&entry.id) {
            return Err(CatalogError::Store(format!("entry {} already exists", entry.id)));
        }
        tables.entries.insert(entry.id, entry.clone());
        Ok(())
    }

    fn update_entry(&self, entry: &Entry) -> Result<()> {
        let mut tables = self.write()?;
        let stored = tables
            .entries
            .get_mut(&entry.id)
            .ok_or(CatalogError::EntryNotFound(entry.id))?;
        let attrs = std::mem::take(&mut stored.attrs);
        *stored = entry.clone();
        stored.attrs = attrs;
        Ok(())
    }

    fn entry(&self, id: EntryId) -> Result<Option<Entry>> {
        Ok(self.read()?.entries.get(&id).cloned())
    }

    fn entries_of(&self, entity: EntityId) -> Result<Vec<Entry>> {
        Ok(self
            .read()?
            .entries
            .values()
            .filter(|e| e.entity_id == entity)
            .cloned()
            .collect())
    }

    fn destroy_entry(&self, id: EntryId) -> Result<()> {
        let mut tables = self.write()?;
        tables.entries.remove(&id);

        let owned: BTreeSet<AttributeId> = tables
            .attributes
            .values()
            .filter(|a| a.entry_id == id)
            .map(|a| a.id)
            .collect();
        tables.attributes.retain(|attr_id, _| !owned.contains(attr_id));
        tables.attr_values.retain(|attr_id, _| !owned.contains(attr_id));
        tables.values.retain(|_, v| !owned.contains(&v.attribute_id));

        for value in tables.values.values_mut() {
            if value.referral == Some(id) {
                value.referral = None;
            }
        }
        Ok(())
    }

    fn insert_attribute(&self, attr: &Attribute) -> Result<()> {
        let mut tables = self.write()?;
        let entry = tables
            .entries
            .get_mut(&attr.entry_id)
            .ok_or(CatalogError::EntryNotFound(attr.entry_id))?;
        entry.attrs.push(attr.id);
        tables.attributes.insert(attr.id, attr.clone());
        Ok(())
    }

    fn update_attribute(&self, attr: &Attribute) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.attributes.contains_key(&attr.id) {
            return Err(CatalogError::AttributeNotFound(attr.id));
        }
        tables.attributes.insert(attr.id, attr.clone());
        Ok(())
    }

    fn unlink_attribute(&self, entry: EntryId, attr: AttributeId) -> Result<()> {
        let mut tables = self.write()?;
        if let Some(entry) = tables.entries.get_mut(&entry) {
            entry.attrs.retain(|id| *id != attr);
        }
        Ok(())
    }

    fn attribute(&self, id: AttributeId) -> Result<Option<Attribute>> {
        Ok(self.read()?.attributes.get(&id).cloned())
    }

    fn attributes_of(&self, entry: EntryId) -> Result<Vec<Attribute>> {
        Ok(self
            .read()?
            .attributes
            .values()
            .filter(|a| a.entry_id == entry)
            .cloned()
            .collect())
    }

    fn insert_values(&self, values: &[Value]) -> Result<()> {
        let mut tables = self.write()?;
        for value in values {
            if value.parent_value.is_none() {
                tables
                    .attr_values
                    .entry(value.attribute_id)
                    .or_default()
                    .push(value.id);
            }
            tables.values.insert(value.id, value.clone());
        }
        Ok(())
    }

    fn value(&self, id: ValueId) -> Result<Option<Value>> {
        Ok(self.read()?.values.get(&id).cloned())
    }

    fn values_of(&self, attr: AttributeId) -> Result<Vec<Value>> {
        let tables = self.read()?;
        let mut values: Vec<Value> = tables
            .attr_values
            .get(&attr)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.values.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        values.sort_by_key(|v| (v.created_at, v.id));
        Ok(values)
    }

    fn children_of(&self, parent: ValueId) -> Result<Vec<Value>> {
        let tables = self.read()?;
        Ok(tables
            .values
            .get(&parent)
            .map(|container| {
                container
                    .children
                    .iter()
                    .filter_map(|id| tables.values.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn promote_latest(&self, attr: AttributeId, value: ValueId) -> Result<()> {
        let mut tables = self.write()?;
        let ids = tables.attr_values.get(&attr).cloned().unwrap_or_default();
        if !ids.contains(&value) {
            return Err(CatalogError::Store(format!(
                "value {} is not a top-level value of attribute {}",
                value, attr
            )));
        }
        for id in ids {
            if let Some(stored) = tables.values.get_mut(&id) {
                stored.is_latest = id == value;
            }
        }
        Ok(())
    }

    fn values_referring(&self, entry: EntryId) -> Result<Vec<Value>> {
        Ok(self
            .read()?
            .values
            .values()
            .filter(|v| v.referral == Some(entry))
            .cloned()
            .collect())
    }
}
