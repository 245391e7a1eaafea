use crate::error::Result;
use crate::model::{
    Actor, ActorId, Attribute, AttributeId, Entity, EntityAttr, EntityAttrId, EntityId, Entry,
    EntryId, Principal, PrincipalId, PrincipalKind, ValueId,
};
use crate::values::Value;

/// Abstract interface for the relational store.
///
/// All methods take `&self`; implementations synchronize internally so one
/// backend can serve concurrent callers. Every mutation is atomic on its own,
/// and no method holds a lock across calls.
pub trait StorageBackend: Send + Sync {
    // --- Identity ---

    /// Allocate the next id from the store-wide sequence.
    fn next_id(&self) -> Result<u64>;

    // --- Schema Registry ---

    fn save_entity(&self, entity: &Entity) -> Result<()>;

    fn save_entity_attr(&self, attr: &EntityAttr) -> Result<()>;

    fn entity(&self, id: EntityId) -> Result<Option<Entity>>;

    fn entity_by_name(&self, name: &str) -> Result<Option<Entity>>;

    /// All entities, active or not, in id order.
    fn entities(&self) -> Result<Vec<Entity>>;

    fn entity_attr(&self, id: EntityAttrId) -> Result<Option<EntityAttr>>;

    /// Schema attributes of an entity, active or not, ordered by `(index, id)`.
    fn entity_attrs(&self, entity: EntityId) -> Result<Vec<EntityAttr>>;

    // --- Principals & Actors ---

    fn save_principal(&self, principal: &Principal) -> Result<()>;

    fn principal(&self, kind: PrincipalKind, id: PrincipalId) -> Result<Option<Principal>>;

    fn principal_by_name(&self, kind: PrincipalKind, name: &str) -> Result<Option<Principal>>;

    fn principals(&self, kind: PrincipalKind) -> Result<Vec<Principal>>;

    fn save_actor(&self, actor: &Actor) -> Result<()>;

    fn actor(&self, id: ActorId) -> Result<Option<Actor>>;

    fn actor_by_name(&self, name: &str) -> Result<Option<Actor>>;

    // --- Entries ---

    fn insert_entry(&self, entry: &Entry) -> Result<()>;

    /// Persist every field except `attrs`, which only changes through
    /// [`StorageBackend::insert_attribute`] and [`StorageBackend::unlink_attribute`].
    fn update_entry(&self, entry: &Entry) -> Result<()>;

    fn entry(&self, id: EntryId) -> Result<Option<Entry>>;

    /// Entries of an entity, active or not, in id order.
    fn entries_of(&self, entity: EntityId) -> Result<Vec<Entry>>;

    /// Remove an entry with its attributes and values, and clear every weak
    /// reference pointing at it.
    fn destroy_entry(&self, id: EntryId) -> Result<()>;

    // --- Attributes ---

    /// Insert an attribute and append it to its entry's link list in one step.
    fn insert_attribute(&self, attr: &Attribute) -> Result<()>;

    fn update_attribute(&self, attr: &Attribute) -> Result<()>;

    fn unlink_attribute(&self, entry: EntryId, attr: AttributeId) -> Result<()>;

    fn attribute(&self, id: AttributeId) -> Result<Option<Attribute>>;

    /// Every attribute bound to an entry, linked or not, in id order.
    fn attributes_of(&self, entry: EntryId) -> Result<Vec<Attribute>>;

    // --- Values ---

    /// Insert a batch of values atomically.
    fn insert_values(&self, values: &[Value]) -> Result<()>;

    fn value(&self, id: ValueId) -> Result<Option<Value>>;

    /// Top-level (non-child) values of an attribute, oldest first.
    fn values_of(&self, attr: AttributeId) -> Result<Vec<Value>>;

    /// Children of an array container in container order.
    fn children_of(&self, parent: ValueId) -> Result<Vec<Value>>;

    /// Make `value` the only top-level value of `attr` carrying `latest`,
    /// in one critical section.
    fn promote_latest(&self, attr: AttributeId, value: ValueId) -> Result<()>;

    /// Every value, top-level or child, whose weak reference points at `entry`.
    fn values_referring(&self, entry: EntryId) -> Result<Vec<Value>>;
}
