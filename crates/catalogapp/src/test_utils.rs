//! Shared fixtures for unit and integration tests.
//!
//! [`Fixture`] loads a small infrastructure schema into an in-memory catalog:
//!
//! | Entity | Attribute | Kind | Notes |
//! |--------|-----------|------|-------|
//! | Network | cidr | string | |
//! | Server | hostname | string | |
//! | | note | text | |
//! | | enabled | boolean | |
//! | | installed | date | |
//! | | network | object → Network | delete in chain |
//! | | links | array_object → Server, Network | delete in chain |
//! | | ports | array_string | |
//! | | owner / owners | group / array_group | |
//! | | role / roles | role / array_role | |
//! | | uplink / nics | named_object / array_named_object | |
//!
//! Groups `admins`, `ops`; roles `operator`, `auditor`.

use crate::catalog::Catalog;
use crate::model::{
    Actor, ActorId, Attribute, AttributeId, EntityAttr, EntityId, Entry, PrincipalKind,
};
use crate::schema::SchemaDocument;
use crate::store::{MemBackend, StorageBackend};
use serde_json::{json, Map, Value as Json};

pub struct Fixture {
    pub catalog: Catalog<MemBackend>,
    pub admin: Actor,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn schema_document() -> SchemaDocument {
    serde_json::from_value(json!({
        "entities": [
            {"name": "Network", "attrs": [{"name": "cidr", "kind": "string"}]},
            {"name": "Server", "attrs": [
                {"name": "hostname", "kind": "string"},
                {"name": "note", "kind": "text"},
                {"name": "enabled", "kind": "boolean"},
                {"name": "installed", "kind": "date"},
                {"name": "network", "kind": "object", "referral": ["Network"], "delete_in_chain": true},
                {"name": "links", "kind": "array_object", "referral": ["Server", "Network"], "delete_in_chain": true},
                {"name": "ports", "kind": "array_string"},
                {"name": "owner", "kind": "group"},
                {"name": "owners", "kind": "array_group"},
                {"name": "role", "kind": "role"},
                {"name": "roles", "kind": "array_role"},
                {"name": "uplink", "kind": "named_object", "referral": ["Network"]},
                {"name": "nics", "kind": "array_named_object", "referral": ["Network"]}
            ]}
        ],
        "groups": ["admins", "ops"],
        "roles": ["operator", "auditor"]
    }))
    .expect("fixture schema is valid")
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_catalog(Catalog::new(MemBackend::new()))
    }

    /// Load the fixture schema into an already configured catalog.
    pub fn with_catalog(catalog: Catalog<MemBackend>) -> Self {
        catalog
            .load_schema(&schema_document())
            .expect("fixture schema loads");
        let admin = Actor::new(ActorId(1), "admin");
        catalog.store().save_actor(&admin).expect("save admin");
        Self { catalog, admin }
    }

    pub fn store(&self) -> &MemBackend {
        self.catalog.store()
    }

    pub fn entity(&self, name: &str) -> EntityId {
        self.store()
            .entity_by_name(name)
            .expect("store")
            .expect("fixture entity")
            .id
    }

    pub fn schema_attr(&self, entity: &str, name: &str) -> EntityAttr {
        self.store()
            .entity_attrs(self.entity(entity))
            .expect("store")
            .into_iter()
            .find(|a| a.name == name)
            .expect("fixture schema attribute")
    }

    pub fn group_id(&self, name: &str) -> u64 {
        self.principal_id(PrincipalKind::Group, name)
    }

    pub fn role_id(&self, name: &str) -> u64 {
        self.principal_id(PrincipalKind::Role, name)
    }

    fn principal_id(&self, kind: PrincipalKind, name: &str) -> u64 {
        self.store()
            .principal_by_name(kind, name)
            .expect("store")
            .expect("fixture principal")
            .id
            .0
    }

    /// Create an entry through the public create path.
    pub fn create(&self, entity: &str, name: &str, attrs: Json) -> Entry {
        let attrs: Map<String, Json> = match attrs {
            Json::Object(map) => map,
            Json::Null => Map::new(),
            other => panic!("attrs must be an object, got {}", other),
        };
        self.catalog
            .create_entry(self.entity(entity), name, &attrs, &self.admin)
            .expect("create entry")
    }

    /// Fresh copy of an entry from the store.
    pub fn entry(&self, entry: &Entry) -> Entry {
        self.catalog.entry_or_err(entry.id).expect("entry exists")
    }

    /// The active attribute of `entry` for schema attribute `name`.
    pub fn attr(&self, entry: &Entry, name: &str) -> Attribute {
        let entity = self
            .store()
            .entity(entry.entity_id)
            .expect("store")
            .expect("entity");
        let schema = self.schema_attr(&entity.name, name);
        let entry = self.entry(entry);
        self.catalog
            .ensure_attribute(&entry, &schema, &self.admin)
            .expect("ensure attribute")
    }

    /// The most recently linked attribute named `name`, active or not.
    /// Unlike [`Fixture::attr`] this never materializes anything.
    pub fn attr_id(&self, entry: &Entry, name: &str) -> AttributeId {
        self.entry(entry)
            .attrs
            .iter()
            .rev()
            .map(|id| self.store_attr(*id))
            .find(|a| a.name == name)
            .expect("linked attribute")
            .id
    }

    pub fn store_attr(&self, id: AttributeId) -> Attribute {
        self.store()
            .attribute(id)
            .expect("store")
            .expect("attribute exists")
    }

    /// Plain JSON of an attribute's latest value.
    pub fn value_of(&self, entry: &Entry, name: &str) -> Json {
        let snapshot = self
            .catalog
            .snapshot(&self.entry(entry), &self.admin, false)
            .expect("snapshot")
            .expect("readable");
        snapshot
            .attrs
            .into_iter()
            .find(|a| a.name == name)
            .map(|a| a.value)
            .unwrap_or(Json::Null)
    }
}
