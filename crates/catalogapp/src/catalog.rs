//! The catalog service handle.
//!
//! [`Catalog`] owns the collaborators every operation needs: the store, the
//! search index, the capability checker, configuration and the
//! materialization lock. Engine, entry and search operations are implemented
//! as `impl Catalog` blocks in their own modules.

use crate::acl::{AclInfo, AclLevel, AclTarget, AllowAll, PermissionChecker};
use crate::config::CatalogConfig;
use crate::engine::lock::KeyedLock;
use crate::error::{CatalogError, Result};
use crate::model::{
    Actor, Attribute, AttributeId, Entity, EntityAttr, EntityAttrId, EntityId, Entry, EntryId,
};
use crate::search::{MemIndex, SearchIndex};
use crate::store::StorageBackend;
use std::sync::Arc;

pub struct Catalog<B: StorageBackend> {
    store: B,
    index: Arc<dyn SearchIndex>,
    acl: Arc<dyn PermissionChecker>,
    config: CatalogConfig,
    pub(crate) locks: KeyedLock,
}

impl<B: StorageBackend> Catalog<B> {
    /// A catalog over `store` with an in-process index, no access control
    /// and default configuration.
    pub fn new(store: B) -> Self {
        let config = CatalogConfig::default();
        Self {
            store,
            index: Arc::new(MemIndex::new()),
            acl: Arc::new(AllowAll),
            locks: KeyedLock::new(config.lock_wait(), config.lock_ttl()),
            config,
        }
    }

    pub fn with_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn with_permissions(mut self, acl: Arc<dyn PermissionChecker>) -> Self {
        self.acl = acl;
        self
    }

    pub fn with_config(mut self, config: CatalogConfig) -> Self {
        self.locks = KeyedLock::new(config.lock_wait(), config.lock_ttl());
        self.config = config;
        self
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn index(&self) -> &dyn SearchIndex {
        self.index.as_ref()
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    // --- Capability Checks ---

    pub fn can(
        &self,
        actor: &Actor,
        object_id: impl Into<u64>,
        acl: &AclInfo,
        level: AclLevel,
    ) -> bool {
        self.acl
            .has_permission(actor, AclTarget::new(object_id, acl), level)
    }

    pub(crate) fn require(
        &self,
        actor: &Actor,
        object_id: impl Into<u64>,
        acl: &AclInfo,
        level: AclLevel,
        what: &str,
    ) -> Result<()> {
        if self.can(actor, object_id, acl, level) {
            Ok(())
        } else {
            Err(CatalogError::PermissionDenied(format!(
                "{} requires {:?} permission",
                what, level
            )))
        }
    }

    /// Read capability on both the entry and its schema.
    pub(crate) fn can_read_entry(&self, actor: &Actor, entry: &Entry) -> Result<bool> {
        let Some(entity) = self.store.entity(entry.entity_id)? else {
            return Ok(false);
        };
        Ok(self.can(actor, entity.id, &entity.acl, AclLevel::Readable)
            && self.can(actor, entry.id, &entry.acl, AclLevel::Readable))
    }

    /// `level` on the schema attribute and, when materialized, the attribute.
    pub(crate) fn can_access_attr(
        &self,
        actor: &Actor,
        schema: &EntityAttr,
        attr: Option<&Attribute>,
        level: AclLevel,
    ) -> bool {
        self.can(actor, schema.id, &schema.acl, level)
            && attr.map_or(true, |a| self.can(actor, a.id, &a.acl, level))
    }

    // --- Lookups ---

    pub(crate) fn next_id(&self) -> Result<u64> {
        self.store.next_id()
    }

    pub fn entity_or_err(&self, id: EntityId) -> Result<Entity> {
        self.store.entity(id)?.ok_or(CatalogError::EntityNotFound(id))
    }

    pub fn entry_or_err(&self, id: EntryId) -> Result<Entry> {
        self.store.entry(id)?.ok_or(CatalogError::EntryNotFound(id))
    }

    pub fn attribute_or_err(&self, id: AttributeId) -> Result<Attribute> {
        self.store
            .attribute(id)?
            .ok_or(CatalogError::AttributeNotFound(id))
    }

    pub fn schema_attr_or_err(&self, id: EntityAttrId) -> Result<EntityAttr> {
        self.store
            .entity_attr(id)?
            .ok_or_else(|| CatalogError::NotFound(format!("schema attribute {}", id)))
    }

    /// Active schema attributes of an entity in display order.
    pub fn active_schema_attrs(&self, entity: EntityId) -> Result<Vec<EntityAttr>> {
        Ok(self
            .store
            .entity_attrs(entity)?
            .into_iter()
            .filter(|a| a.is_active)
            .collect())
    }

    /// The active entry named `name` under `entity`, if any.
    pub fn find_active_entry(&self, entity: EntityId, name: &str) -> Result<Option<Entry>> {
        Ok(self
            .store
            .entries_of(entity)?
            .into_iter()
            .find(|e| e.is_active && e.name == name))
    }
}
