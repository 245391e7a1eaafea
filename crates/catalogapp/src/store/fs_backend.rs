use super::backend::StorageBackend;
use super::mem_backend::{MemBackend, Tables};
use crate::error::{CatalogError, Result};
use crate::model::{
    Actor, ActorId, Attribute, AttributeId, Entity, EntityAttr, EntityAttrId, EntityId, Entry,
    EntryId, Principal, PrincipalId, PrincipalKind, ValueId,
};
use crate::values::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub const SNAPSHOT_FILE: &str = "catalog.json";

/// File-backed storage.
///
/// Reads are served from memory. Every mutation is applied in memory and then
/// the whole table set is written to `catalog.json` atomically (temp file in
/// the same directory, then rename). Id allocation alone does not write; the
/// counter is flushed with the next mutation, so only ids that never reached
/// a persisted record can be handed out again after a restart.
pub struct FsBackend {
    root: PathBuf,
    inner: MemBackend,
    flush_lock: Mutex<()>,
    tmp_seq: AtomicU64,
}

impl FsBackend {
    /// Open (or create) the store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(CatalogError::Io)?;
        let path = root.join(SNAPSHOT_FILE);
        let tables = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(CatalogError::Io)?;
            serde_json::from_str::<Tables>(&raw)?
        } else {
            Tables::default()
        };
        Ok(Self {
            root,
            inner: MemBackend::from_tables(tables),
            flush_lock: Mutex::new(()),
            tmp_seq: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    fn flush(&self) -> Result<()> {
        let _guard = self
            .flush_lock
            .lock()
            .map_err(|_| CatalogError::Store("flush lock poisoned".to_string()))?;
        let json = self.inner.to_json()?;

        // Atomic Write
        let seq = self.tmp_seq.fetch_add(1, Ordering::SeqCst);
        let tmp_path = self
            .root
            .join(format!(".catalog-{}-{}.tmp", std::process::id(), seq));
        fs::write(&tmp_path, json).map_err(CatalogError::Io)?;
        fs::rename(&tmp_path, self.snapshot_path()).map_err(CatalogError::Io)?;
        Ok(())
    }

    fn persisted<T>(&self, result: Result<T>) -> Result<T> {
        let value = result?;
        self.flush()?;
        Ok(value)
    }
}

impl StorageBackend for FsBackend {
    fn next_id(&self) -> Result<u64> {
        self.inner.next_id()
    }

    fn save_entity(&self, entity: &Entity) -> Result<()> {
        self.persisted(self.inner.save_entity(entity))
    }

    fn save_entity_attr(&self, attr: &EntityAttr) -> Result<()> {
        self.persisted(self.inner.save_entity_attr(attr))
    }

    fn entity(&self, id: EntityId) -> Result<Option<Entity>> {
        self.inner.entity(id)
    }

    fn entity_by_name(&self, name: &str) -> Result<Option<Entity>> {
        self.inner.entity_by_name(name)
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        self.inner.entities()
    }

    fn entity_attr(&self, id: EntityAttrId) -> Result<Option<EntityAttr>> {
        self.inner.entity_attr(id)
    }

    fn entity_attrs(&self, entity: EntityId) -> Result<Vec<EntityAttr>> {
        self.inner.entity_attrs(entity)
    }

    fn save_principal(&self, principal: &Principal) -> Result<()> {
        self.persisted(self.inner.save_principal(principal))
    }

    fn principal(&self, kind: PrincipalKind, id: PrincipalId) -> Result<Option<Principal>> {
        self.inner.principal(kind, id)
    }

    fn principal_by_name(&self, kind: PrincipalKind, name: &str) -> Result<Option<Principal>> {
        self.inner.principal_by_name(kind, name)
    }

    fn principals(&self, kind: PrincipalKind) -> Result<Vec<Principal>> {
        self.inner.principals(kind)
    }

    fn save_actor(&self, actor: &Actor) -> Result<()> {
        self.persisted(self.inner.save_actor(actor))
    }

    fn actor(&self, id: ActorId) -> Result<Option<Actor>> {
        self.inner.actor(id)
    }

    fn actor_by_name(&self, name: &str) -> Result<Option<Actor>> {
        self.inner.actor_by_name(name)
    }

    fn insert_entry(&self, entry: &Entry) -> Result<()> {
        self.persisted(self.inner.insert_entry(entry))
    }

    fn update_entry(&self, entry: &Entry) -> Result<()> {
        self.persisted(self.inner.update_entry(entry))
    }

    fn entry(&self, id: EntryId) -> Result<Option<Entry>> {
        self.inner.entry(id)
    }

    fn entries_of(&self, entity: EntityId) -> Result<Vec<Entry>> {
        self.inner.entries_of(entity)
    }

    fn destroy_entry(&self, id: EntryId) -> Result<()> {
        self.persisted(self.inner.destroy_entry(id))
    }

    fn insert_attribute(&self, attr: &Attribute) -> Result<()> {
        self.persisted(self.inner.insert_attribute(attr))
    }

    fn update_attribute(&self, attr: &Attribute) -> Result<()> {
        self.persisted(self.inner.update_attribute(attr))
    }

    fn unlink_attribute(&self, entry: EntryId, attr: AttributeId) -> Result<()> {
        self.persisted(self.inner.unlink_attribute(entry, attr))
    }

    fn attribute(&self, id: AttributeId) -> Result<Option<Attribute>> {
        self.inner.attribute(id)
    }

    fn attributes_of(&self, entry: EntryId) -> Result<Vec<Attribute>> {
        self.inner.attributes_of(entry)
    }

    fn insert_values(&self, values: &[Value]) -> Result<()> {
        self.persisted(self.inner.insert_values(values))
    }

    fn value(&self, id: ValueId) -> Result<Option<Value>> {
        self.inner.value(id)
    }

    fn values_of(&self, attr: AttributeId) -> Result<Vec<Value>> {
        self.inner.values_of(attr)
    }

    fn children_of(&self, parent: ValueId) -> Result<Vec<Value>> {
        self.inner.children_of(parent)
    }

    fn promote_latest(&self, attr: AttributeId, value: ValueId) -> Result<()> {
        self.persisted(self.inner.promote_latest(attr, value))
    }

    fn values_referring(&self, entry: EntryId) -> Result<Vec<Value>> {
        self.inner.values_referring(entry)
    }
}
