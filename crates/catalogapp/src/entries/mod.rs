//! # Entry Aggregate
//!
//! Entry-level operations composed from the attribute engine:
//!
//! - creation, update and copy (this module)
//! - attribute completion, views and snapshots (this module)
//! - soft delete, restore and purge (`lifecycle`)
//! - reverse references and referral candidates (`referrals`)
//! - change history (`history`)
//!
//! Every operation re-checks capabilities through the catalog's
//! [`crate::acl::PermissionChecker`]; nothing here trusts the search index.

mod history;
mod lifecycle;
mod referrals;

pub use history::{HistoryRecord, HistoryValue};
pub use referrals::{Candidate, ReferrerFilter};

use crate::acl::AclLevel;
use crate::attributes::{default_value, AttrValue, AttributeKind, Referent};
use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{Actor, AttributeId, EntityAttr, EntityAttrId, EntityId, Entry, EntryId, EntryStatus, ValueId};
use crate::store::StorageBackend;
use crate::values::{render, render_json, CloneOverrides, RenderOptions};
use serde::Serialize;
use serde_json::{json, Map, Value as Json};
use tracing::{info, warn};

/// One schema attribute as seen by an actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttrView {
    pub schema_id: EntityAttrId,
    pub attr_id: Option<AttributeId>,
    pub name: String,
    pub kind: AttributeKind,
    pub is_mandatory: bool,
    pub is_readable: bool,
    /// Decoded latest value; `None` when unreadable or not materialized.
    pub value: Option<AttrValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotAttr {
    pub id: AttributeId,
    pub schema_id: EntityAttrId,
    pub name: String,
    pub kind: AttributeKind,
    pub is_mandatory: bool,
    pub value: Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySnapshot {
    pub id: EntryId,
    pub name: String,
    pub entity: Referent,
    pub attrs: Vec<SnapshotAttr>,
}

impl EntrySnapshot {
    pub fn attr(&self, name: &str) -> Option<&SnapshotAttr> {
        self.attrs.iter().find(|a| a.name == name)
    }
}

impl<B: StorageBackend> Catalog<B> {
    /// Materialize every active schema attribute of the entry and seed array
    /// attributes with an empty container.
    pub fn complete_attributes(&self, entry: &Entry, actor: &Actor) -> Result<()> {
        let schemas = self.active_schema_attrs(entry.entity_id)?;
        let mut missing = Vec::new();
        for schema in &schemas {
            if self.active_attribute(entry, schema.id)?.is_none() {
                missing.push(schema);
            }
        }

        if !missing.is_empty() {
            self.set_status(entry.id, EntryStatus::COMPLEMENTING_ATTRS, true)?;
            for schema in missing {
                self.ensure_attribute(entry, schema, actor)?;
            }
        }
        for schema in schemas.iter().filter(|s| s.kind.is_array()) {
            let current = self.entry_or_err(entry.id)?;
            if let Some(attr) = self.active_attribute(&current, schema.id)? {
                self.latest_value_for(&attr, schema, false)?;
            }
        }
        self.dedup_attributes(entry)?;
        self.set_status(entry.id, EntryStatus::COMPLEMENTING_ATTRS, false)?;
        Ok(())
    }

    /// Every active schema attribute in display order with its readability
    /// at `level` and, when readable and materialized, its latest value.
    pub fn available_attributes(&self, entry: &Entry, actor: &Actor, level: AclLevel) -> Result<Vec<AttrView>> {
        let mut views = Vec::new();
        for schema in self.active_schema_attrs(entry.entity_id)? {
            let attr = self.active_attribute(entry, schema.id)?;
            let is_readable = self.can_access_attr(actor, &schema, attr.as_ref(), level);
            let value = match (&attr, is_readable) {
                (Some(attr), true) => Some(match self.latest_value_for(attr, &schema, true)? {
                    Some(latest) => render(self.store(), &latest, RenderOptions::default())?,
                    None => default_value(schema.kind),
                }),
                _ => None,
            };
            views.push(AttrView {
                schema_id: schema.id,
                attr_id: attr.map(|a| a.id),
                name: schema.name.clone(),
                kind: schema.kind,
                is_mandatory: schema.is_mandatory,
                is_readable,
                value,
            });
        }
        Ok(views)
    }

    /// The readable content of an active entry, or `None` when the actor
    /// cannot read the entry or its schema.
    pub fn snapshot(&self, entry: &Entry, actor: &Actor, with_metadata: bool) -> Result<Option<EntrySnapshot>> {
        if !entry.is_active || !self.can_read_entry(actor, entry)? {
            return Ok(None);
        }
        self.complete_attributes(entry, actor)?;
        let entity = self.entity_or_err(entry.entity_id)?;
        let current = self.entry_or_err(entry.id)?;
        let options = if with_metadata {
            RenderOptions::with_metadata()
        } else {
            RenderOptions::default()
        };

        let mut attrs = Vec::new();
        for schema in self.active_schema_attrs(entity.id)? {
            let Some(attr) = self.active_attribute(&current, schema.id)? else {
                continue;
            };
            if !self.can_access_attr(actor, &schema, Some(&attr), AclLevel::Readable) {
                continue;
            }
            let value = match self.latest_value_for(&attr, &schema, true)? {
                Some(latest) => render_json(self.store(), &latest, options)?,
                None => default_value(schema.kind).to_plain(with_metadata),
            };
            attrs.push(SnapshotAttr {
                id: attr.id,
                schema_id: schema.id,
                name: schema.name.clone(),
                kind: schema.kind,
                is_mandatory: schema.is_mandatory,
                value,
            });
        }
        Ok(Some(EntrySnapshot {
            id: current.id,
            name: current.name,
            entity: Referent::new(entity.id, entity.name),
            attrs,
        }))
    }

    /// Name-only export form: `{"name", "entity", "attrs": {name: value}}`.
    pub fn export_entry(&self, entry: &Entry, actor: &Actor) -> Result<Option<Json>> {
        if !entry.is_active || !self.can_read_entry(actor, entry)? {
            return Ok(None);
        }
        let entity = self.entity_or_err(entry.entity_id)?;
        let mut attrs = Map::new();
        for view in self.available_attributes(entry, actor, AclLevel::Readable)? {
            if !view.is_readable {
                continue;
            }
            let value = view.value.unwrap_or_else(|| default_value(view.kind));
            attrs.insert(view.name, value.to_export());
        }
        Ok(Some(json!({
            "name": entry.name,
            "entity": entity.name,
            "attrs": attrs,
        })))
    }

    /// Latest value of one named attribute, `None` when unreadable.
    pub fn attribute_value(&self, entry: &Entry, name: &str, actor: &Actor) -> Result<Option<AttrValue>> {
        let schema = self
            .active_schema_attrs(entry.entity_id)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CatalogError::NotFound(format!("attribute {}", name)))?;
        let attr = self.active_attribute(entry, schema.id)?;
        if !self.can_read_entry(actor, entry)?
            || !self.can_access_attr(actor, &schema, attr.as_ref(), AclLevel::Readable)
        {
            return Ok(None);
        }
        let Some(attr) = attr else {
            return Ok(Some(default_value(schema.kind)));
        };
        Ok(Some(match self.latest_value_for(&attr, &schema, true)? {
            Some(latest) => render(self.store(), &latest, RenderOptions::default())?,
            None => default_value(schema.kind),
        }))
    }

    pub fn create_entry(
        &self,
        entity: EntityId,
        name: &str,
        attrs: &Map<String, Json>,
        actor: &Actor,
    ) -> Result<Entry> {
        let entity = self.entity_or_err(entity)?;
        if !entity.is_active {
            return Err(CatalogError::EntityNotFound(entity.id));
        }
        self.require(actor, entity.id, &entity.acl, AclLevel::Writable, "creating an entry")?;
        let name = self.unused_name(entity.id, name, None)?;
        let schemas = self.active_schema_attrs(entity.id)?;
        self.check_inputs(&schemas, attrs, actor, true)?;

        let mut entry = Entry::new(EntryId(self.next_id()?), entity.id, name, actor);
        entry.status = EntryStatus::CREATING;
        self.store().insert_entry(&entry)?;

        self.write_inputs(&entry, &schemas, attrs, actor)?;
        self.complete_attributes(&entry, actor)?;
        let entry = self.set_status(entry.id, EntryStatus::CREATING, false)?;
        self.publish_entry(&entry);
        info!(entry = %entry.id, name = %entry.name, entity = %entity.name, "entry created");
        Ok(entry)
    }

    /// Rename an entry and/or write new attribute content. Unchanged values
    /// record no version.
    pub fn update_entry(
        &self,
        entry_id: EntryId,
        name: Option<&str>,
        attrs: &Map<String, Json>,
        actor: &Actor,
    ) -> Result<Entry> {
        let entry = self.entry_or_err(entry_id)?;
        if !entry.is_active {
            return Err(CatalogError::validation("specified entry has already been deleted"));
        }
        self.require(actor, entry.id, &entry.acl, AclLevel::Writable, "editing an entry")?;
        let rename = match name {
            Some(name) if name.trim() != entry.name => {
                Some(self.unused_name(entry.entity_id, name, Some(entry.id))?)
            }
            _ => None,
        };
        let schemas = self.active_schema_attrs(entry.entity_id)?;
        self.check_inputs(&schemas, attrs, actor, false)?;

        let mut entry = self.set_status(entry.id, EntryStatus::EDITING, true)?;
        if let Some(name) = &rename {
            entry.name = name.clone();
            entry.updated_at = chrono::Utc::now();
            self.store().update_entry(&entry)?;
        }
        let written = self.write_inputs(&entry, &schemas, attrs, actor)?;
        let entry = self.set_status(entry.id, EntryStatus::EDITING, false)?;

        self.publish_entry(&entry);
        if rename.is_some() {
            self.publish_referrers(entry.id)?;
        }
        info!(entry = %entry.id, versions = written, renamed = rename.is_some(), "entry updated");
        Ok(entry)
    }

    /// Copy an active entry under each of `names`. Names already taken by an
    /// active entry of the same schema are skipped.
    pub fn copy_entry(&self, source: EntryId, names: &[String], actor: &Actor) -> Result<Vec<Entry>> {
        let source = self.entry_or_err(source)?;
        if !source.is_active {
            return Err(CatalogError::validation("specified entry has already been deleted"));
        }
        if !self.can_read_entry(actor, &source)? {
            return Err(CatalogError::PermissionDenied(
                "copying an entry requires Readable permission".to_string(),
            ));
        }
        let entity = self.entity_or_err(source.entity_id)?;
        self.require(actor, entity.id, &entity.acl, AclLevel::Writable, "copying an entry")?;

        let mut copies = Vec::new();
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if self.find_active_entry(entity.id, name)?.is_some() {
                warn!(name, "copy skipped, name already taken");
                continue;
            }
            copies.push(self.clone_entry(&source, name, actor)?);
        }
        Ok(copies)
    }

    fn clone_entry(&self, source: &Entry, name: &str, actor: &Actor) -> Result<Entry> {
        let mut entry = Entry::new(EntryId(self.next_id()?), source.entity_id, name, actor);
        entry.status = EntryStatus::CREATING;
        entry.acl = source.acl;
        self.store().insert_entry(&entry)?;

        for schema in self.active_schema_attrs(source.entity_id)? {
            let Some(src_attr) = self.active_attribute(source, schema.id)? else {
                continue;
            };
            if !self.can_access_attr(actor, &schema, Some(&src_attr), AclLevel::Readable) {
                continue;
            }
            let attr = self.ensure_attribute(&entry, &schema, actor)?;
            let Some(latest) = self.latest_value_for(&src_attr, &schema, true)? else {
                continue;
            };

            let mut head = latest.clone_with(
                ValueId(self.next_id()?),
                CloneOverrides {
                    attribute_id: Some(attr.id),
                    parent_value: None,
                },
                actor,
            );
            let mut batch = Vec::new();
            for child in self.store().children_of(latest.id)? {
                let copy = child.clone_with(
                    ValueId(self.next_id()?),
                    CloneOverrides {
                        attribute_id: Some(attr.id),
                        parent_value: Some(head.id),
                    },
                    actor,
                );
                head.children.push(copy.id);
                batch.push(copy);
            }
            batch.push(head.clone());
            self.store().insert_values(&batch)?;
            self.store().promote_latest(attr.id, head.id)?;
        }

        self.complete_attributes(&entry, actor)?;
        let entry = self.set_status(entry.id, EntryStatus::CREATING, false)?;
        self.publish_entry(&entry);
        info!(source = %source.id, entry = %entry.id, name = %entry.name, "entry copied");
        Ok(entry)
    }

    /// Trimmed `name`, refused when empty or held by another active entry.
    fn unused_name(&self, entity: EntityId, name: &str, owner: Option<EntryId>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::validation("entry name is required"));
        }
        if let Some(existing) = self.find_active_entry(entity, name)? {
            if Some(existing.id) != owner {
                return Err(CatalogError::validation(format!(
                    "entry '{}' already exists",
                    name
                )));
            }
        }
        Ok(name.to_string())
    }

    /// Reject unknown names, unwritable attributes and invalid content
    /// before anything is stored.
    fn check_inputs(
        &self,
        schemas: &[EntityAttr],
        attrs: &Map<String, Json>,
        actor: &Actor,
        creating: bool,
    ) -> Result<()> {
        for key in attrs.keys() {
            if !schemas.iter().any(|s| &s.name == key) {
                return Err(CatalogError::validation(format!("unknown attribute: {}", key)));
            }
        }
        for schema in schemas {
            match attrs.get(&schema.name) {
                Some(input) => {
                    if !self.can(actor, schema.id, &schema.acl, AclLevel::Writable) {
                        return Err(CatalogError::PermissionDenied(format!(
                            "writing {} requires Writable permission",
                            schema.name
                        )));
                    }
                    self.validate_input(schema, input)?;
                }
                None if creating && schema.is_mandatory => {
                    return Err(CatalogError::validation(format!(
                        "{}: mandatory value is missing",
                        schema.name
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Write each provided input through the change gate. Returns how many
    /// versions were recorded.
    fn write_inputs(
        &self,
        entry: &Entry,
        schemas: &[EntityAttr],
        attrs: &Map<String, Json>,
        actor: &Actor,
    ) -> Result<usize> {
        let mut written = 0;
        for schema in schemas {
            let Some(input) = attrs.get(&schema.name) else {
                continue;
            };
            let attr = self.ensure_attribute(entry, schema, actor)?;
            if self.write_if_changed_for(&attr, schema, actor, input)?.is_some() {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Set or clear a processing flag and return the stored entry.
    pub(crate) fn set_status(&self, id: EntryId, flag: EntryStatus, on: bool) -> Result<Entry> {
        let mut entry = self.entry_or_err(id)?;
        if entry.status.contains(flag) != on {
            entry.status.set(flag, on);
            self.store().update_entry(&entry)?;
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use crate::acl::{AclInfo, AclLevel, AclTable};
    use crate::catalog::Catalog;
    use crate::model::{Actor, ActorId, EntryStatus};
    use crate::store::{MemBackend, StorageBackend};
    use crate::test_utils::Fixture;
    use serde_json::{json, Map};
    use std::sync::Arc;

    #[test]
    fn create_writes_given_attributes_and_seeds_arrays() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"hostname": "web-01.local", "enabled": false}));
        assert!(server.status.is_empty());
        assert_eq!(fx.value_of(&server, "hostname"), json!("web-01.local"));
        assert_eq!(fx.value_of(&server, "enabled"), json!(false));
        assert_eq!(fx.value_of(&server, "ports"), json!([]));

        let ports = fx.attr(&server, "ports");
        let latest = fx.catalog.latest_value(&ports, true).unwrap().unwrap();
        assert!(latest.is_container());
    }

    #[test]
    fn create_rejects_duplicates_and_unknown_attributes() {
        let fx = Fixture::new();
        fx.create("Server", "web-01", json!({}));
        let server = fx.entity("Server");
        let err = fx
            .catalog
            .create_entry(server, "web-01", &Map::new(), &fx.admin)
            .unwrap_err();
        assert!(err.is_validation());

        let mut attrs = Map::new();
        attrs.insert("rack".into(), json!("r1"));
        let err = fx.catalog.create_entry(server, "web-02", &attrs, &fx.admin).unwrap_err();
        assert!(err.to_string().contains("unknown attribute"));
        assert!(fx.catalog.find_active_entry(server, "web-02").unwrap().is_none());
    }

    #[test]
    fn snapshot_leaves_scalar_history_untouched() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({}));
        let enabled = fx.attr(&server, "enabled");
        let hostname = fx.attr(&server, "hostname");

        assert_eq!(fx.value_of(&server, "enabled"), json!(false));
        assert_eq!(fx.value_of(&server, "hostname"), json!(""));
        assert!(fx.store().values_of(enabled.id).unwrap().is_empty());
        assert!(fx.store().values_of(hostname.id).unwrap().is_empty());

        let written = fx.catalog.write_if_changed(&enabled, &fx.admin, &json!(false)).unwrap();
        assert!(written.is_some());
        let values = fx.store().values_of(enabled.id).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].created_by, fx.admin.id);
    }

    #[test]
    fn create_enforces_mandatory() {
        let fx = Fixture::new();
        let mut schema = fx.schema_attr("Server", "hostname");
        schema.is_mandatory = true;
        fx.store().save_entity_attr(&schema).unwrap();

        let err = fx
            .catalog
            .create_entry(fx.entity("Server"), "web-01", &Map::new(), &fx.admin)
            .unwrap_err();
        assert!(err.to_string().contains("mandatory"));
    }

    #[test]
    fn update_skips_unchanged_values_and_renames() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"hostname": "a", "ports": ["22"]}));
        let mut attrs = Map::new();
        attrs.insert("hostname".into(), json!("a"));
        attrs.insert("ports".into(), json!(["22", "80"]));
        let updated = fx
            .catalog
            .update_entry(server.id, Some("web-02"), &attrs, &fx.admin)
            .unwrap();
        assert_eq!(updated.name, "web-02");
        assert!(!updated.status.contains(EntryStatus::EDITING));

        let hostname = fx.attr(&server, "hostname");
        assert_eq!(fx.store().values_of(hostname.id).unwrap().len(), 1);
        assert_eq!(fx.value_of(&server, "ports"), json!(["22", "80"]));
    }

    #[test]
    fn snapshot_hides_unreadable_attributes() {
        let acl = Arc::new(AclTable::new());
        let fx = Fixture::with_catalog(Catalog::new(MemBackend::new()).with_permissions(acl.clone()));
        let mut note = fx.schema_attr("Server", "note");
        note.acl = AclInfo::private();
        fx.store().save_entity_attr(&note).unwrap();

        let mut admin = fx.admin.clone();
        admin.is_superuser = true;
        let mut attrs = Map::new();
        attrs.insert("note".into(), json!("secret"));
        let server = fx
            .catalog
            .create_entry(fx.entity("Server"), "web-01", &attrs, &admin)
            .unwrap();

        let guest = Actor::new(ActorId(2), "guest");
        let snapshot = fx.catalog.snapshot(&server, &guest, false).unwrap().unwrap();
        assert!(snapshot.attr("note").is_none());
        assert!(snapshot.attr("hostname").is_some());

        acl.grant(guest.id, note.id, AclLevel::Readable);
        let snapshot = fx.catalog.snapshot(&server, &guest, false).unwrap().unwrap();
        assert_eq!(snapshot.attr("note").unwrap().value, json!("secret"));

        let views = fx
            .catalog
            .available_attributes(&fx.entry(&server), &Actor::new(ActorId(3), "other"), AclLevel::Readable)
            .unwrap();
        let note_view = views.iter().find(|v| v.name == "note").unwrap();
        assert!(!note_view.is_readable);
        assert!(note_view.value.is_none());
    }

    #[test]
    fn snapshot_with_metadata_carries_ids() {
        let fx = Fixture::new();
        let net = fx.create("Network", "net-a", json!({}));
        let server = fx.create("Server", "web-01", json!({"network": net.id.0}));
        let snapshot = fx.catalog.snapshot(&server, &fx.admin, true).unwrap().unwrap();
        assert_eq!(
            snapshot.attr("network").unwrap().value,
            json!({"id": net.id.0, "name": "net-a"})
        );
        assert_eq!(snapshot.entity.name, "Server");
    }

    #[test]
    fn copy_clones_latest_values() {
        let fx = Fixture::new();
        let net = fx.create("Network", "net-a", json!({}));
        let server = fx.create(
            "Server",
            "web-01",
            json!({"hostname": "web", "nics": [{"name": "a", "id": net.id.0}]}),
        );
        fx.create("Server", "taken", json!({}));
        let copies = fx
            .catalog
            .copy_entry(
                server.id,
                &["web-02".to_string(), "taken".to_string(), " ".to_string()],
                &fx.admin,
            )
            .unwrap();
        assert_eq!(copies.len(), 1);
        let copy = &copies[0];
        assert_eq!(fx.value_of(copy, "hostname"), json!("web"));
        assert_eq!(fx.value_of(copy, "nics"), json!([{"a": "net-a"}]));

        let src_attr = fx.attr(&server, "nics");
        let copy_attr = fx.attr(copy, "nics");
        assert_ne!(src_attr.id, copy_attr.id);
        let copied = fx.catalog.latest_value(&copy_attr, true).unwrap().unwrap();
        let children = fx.store().children_of(copied.id).unwrap();
        assert_eq!(children[0].parent_value, Some(copied.id));
        assert_eq!(children[0].attribute_id, copy_attr.id);
    }

    #[test]
    fn export_uses_names() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"owners": ["ops"], "installed": "2024-05-01"}));
        let exported = fx.catalog.export_entry(&server, &fx.admin).unwrap().unwrap();
        assert_eq!(exported["entity"], json!("Server"));
        assert_eq!(exported["attrs"]["owners"], json!(["ops"]));
        assert_eq!(exported["attrs"]["installed"], json!("2024-05-01"));
        assert_eq!(exported["attrs"]["hostname"], json!(""));
    }

    #[test]
    fn attribute_value_reports_unknown_names() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"hostname": "web"}));
        let value = fx.catalog.attribute_value(&server, "hostname", &fx.admin).unwrap().unwrap();
        assert_eq!(value.as_text(), Some("web"));
        assert!(fx.catalog.attribute_value(&server, "rack", &fx.admin).is_err());
    }
}
