//! Schema document loading.
//!
//! The engine only reads schema definitions. This module populates the
//! registry from a [`SchemaDocument`], matching existing records by name so a
//! document can be reloaded: kinds and flags of known attributes are updated
//! in place, attributes missing from the document are deactivated, and
//! entities or principals absent from the document are left alone.

use crate::acl::AclInfo;
use crate::attributes::AttributeKind;
use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{Entity, EntityAttr, EntityAttrId, EntityId, Principal, PrincipalId, PrincipalKind};
use crate::store::StorageBackend;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub acl: AclInfo,
    #[serde(default)]
    pub attrs: Vec<AttrDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrDef {
    pub name: String,
    pub kind: AttributeKind,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub delete_in_chain: bool,
    /// Names of entities an object value may point at.
    #[serde(default)]
    pub referral: Vec<String>,
    /// Display order; defaults to the position in the document.
    #[serde(default)]
    pub index: Option<i32>,
    #[serde(default)]
    pub acl: AclInfo,
}

impl SchemaDocument {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchemaSummary {
    pub entities: usize,
    pub attrs: usize,
    pub deactivated_attrs: usize,
    pub principals: usize,
}

impl<B: StorageBackend> Catalog<B> {
    pub fn load_schema(&self, doc: &SchemaDocument) -> Result<SchemaSummary> {
        let store = self.store();
        let mut summary = SchemaSummary::default();

        let mut entity_ids: HashMap<String, EntityId> = HashMap::new();
        for def in &doc.entities {
            let id = match store.entity_by_name(&def.name)? {
                Some(existing) => existing.id,
                None => EntityId(self.next_id()?),
            };
            store.save_entity(&Entity {
                id,
                name: def.name.clone(),
                note: def.note.clone(),
                is_active: true,
                acl: def.acl,
            })?;
            entity_ids.insert(def.name.clone(), id);
            summary.entities += 1;
        }

        for def in &doc.entities {
            let entity_id = entity_ids[&def.name];
            let mut existing: HashMap<String, EntityAttr> = store
                .entity_attrs(entity_id)?
                .into_iter()
                .map(|a| (a.name.clone(), a))
                .collect();

            for (position, attr_def) in def.attrs.iter().enumerate() {
                let referral = attr_def
                    .referral
                    .iter()
                    .map(|name| self.resolve_entity_name(name, &entity_ids))
                    .collect::<Result<Vec<_>>>()?;
                let id = match existing.remove(&attr_def.name) {
                    Some(found) => found.id,
                    None => EntityAttrId(self.next_id()?),
                };
                store.save_entity_attr(&EntityAttr {
                    id,
                    entity_id,
                    name: attr_def.name.clone(),
                    kind: attr_def.kind,
                    is_mandatory: attr_def.mandatory,
                    is_delete_in_chain: attr_def.delete_in_chain,
                    index: attr_def.index.unwrap_or(position as i32),
                    is_active: true,
                    referral,
                    acl: attr_def.acl,
                })?;
                summary.attrs += 1;
            }

            for (_, mut stale) in existing {
                if stale.is_active {
                    stale.is_active = false;
                    store.save_entity_attr(&stale)?;
                    summary.deactivated_attrs += 1;
                }
            }
        }

        for (kind, names) in [
            (PrincipalKind::Group, &doc.groups),
            (PrincipalKind::Role, &doc.roles),
        ] {
            for name in names {
                let id = match store.principal_by_name(kind, name)? {
                    Some(existing) => existing.id,
                    None => PrincipalId(self.next_id()?),
                };
                store.save_principal(&Principal {
                    id,
                    kind,
                    name: name.clone(),
                    is_active: true,
                })?;
                summary.principals += 1;
            }
        }

        info!(
            entities = summary.entities,
            attrs = summary.attrs,
            principals = summary.principals,
            "schema loaded"
        );
        Ok(summary)
    }

    fn resolve_entity_name(&self, name: &str, loaded: &HashMap<String, EntityId>) -> Result<EntityId> {
        if let Some(id) = loaded.get(name) {
            return Ok(*id);
        }
        self.store()
            .entity_by_name(name)?
            .map(|e| e.id)
            .ok_or_else(|| CatalogError::validation(format!("unknown referral entity: {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemBackend;
    use serde_json::json;

    fn document(kind: &str) -> SchemaDocument {
        serde_json::from_value(json!({
            "entities": [
                {"name": "Network", "attrs": [{"name": "cidr", "kind": "string"}]},
                {"name": "Server", "attrs": [
                    {"name": "hostname", "kind": kind, "mandatory": true},
                    {"name": "network", "kind": "object", "referral": ["Network"], "delete_in_chain": true}
                ]}
            ],
            "groups": ["ops"],
            "roles": ["operator"]
        }))
        .unwrap()
    }

    #[test]
    fn loads_entities_attrs_and_principals() {
        let catalog = Catalog::new(MemBackend::new());
        let summary = catalog.load_schema(&document("string")).unwrap();
        assert_eq!(summary.entities, 2);
        assert_eq!(summary.attrs, 3);
        assert_eq!(summary.principals, 2);

        let network = catalog.store().entity_by_name("Network").unwrap().unwrap();
        let server = catalog.store().entity_by_name("Server").unwrap().unwrap();
        let attrs = catalog.store().entity_attrs(server.id).unwrap();
        assert_eq!(attrs[0].name, "hostname");
        assert!(attrs[0].is_mandatory);
        assert_eq!(attrs[1].referral, vec![network.id]);
        assert!(attrs[1].cascades());
        assert!(catalog
            .store()
            .principal_by_name(PrincipalKind::Group, "ops")
            .unwrap()
            .is_some());
    }

    #[test]
    fn reload_keeps_ids_and_updates_kinds() {
        let catalog = Catalog::new(MemBackend::new());
        catalog.load_schema(&document("string")).unwrap();
        let server = catalog.store().entity_by_name("Server").unwrap().unwrap();
        let before = catalog.store().entity_attrs(server.id).unwrap();

        catalog.load_schema(&document("text")).unwrap();
        let after = catalog.store().entity_attrs(server.id).unwrap();
        assert_eq!(before[0].id, after[0].id);
        assert_eq!(after[0].kind, AttributeKind::TEXT);
    }

    #[test]
    fn attrs_missing_from_reload_are_deactivated() {
        let catalog = Catalog::new(MemBackend::new());
        catalog.load_schema(&document("string")).unwrap();
        let mut doc = document("string");
        doc.entities[1].attrs.pop();
        let summary = catalog.load_schema(&doc).unwrap();
        assert_eq!(summary.deactivated_attrs, 1);

        let server = catalog.store().entity_by_name("Server").unwrap().unwrap();
        assert_eq!(catalog.active_schema_attrs(server.id).unwrap().len(), 1);
    }

    #[test]
    fn unknown_referral_is_rejected() {
        let catalog = Catalog::new(MemBackend::new());
        let doc: SchemaDocument = serde_json::from_value(json!({
            "entities": [{"name": "Server", "attrs": [
                {"name": "rack", "kind": "object", "referral": ["Rack"]}
            ]}]
        }))
        .unwrap();
        assert!(catalog.load_schema(&doc).unwrap_err().is_validation());
    }

    #[test]
    fn bad_kind_label_fails_to_parse() {
        let raw = r#"{"entities": [{"name": "S", "attrs": [{"name": "x", "kind": "named_string"}]}]}"#;
        assert!(SchemaDocument::from_json(raw).is_err());
    }
}
