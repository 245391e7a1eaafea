//! Projection of entries into search documents.

use super::index::ENTRY_DOC_TYPE;
use crate::attributes::{AttributeKind, BaseKind, FieldRef, Referent};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::model::{EntityAttrId, Entry, EntryId, PrincipalId};
use crate::store::StorageBackend;
use crate::values::{principal_kind, Value};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

static DATE_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDocument {
    pub entity: Referent,
    pub name: String,
    /// One row per scalar attribute, one row per array element (or one
    /// blank row for an empty array).
    pub attrs: Vec<DocAttr>,
    pub is_readable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocAttr {
    pub name: String,
    pub schema_id: EntityAttrId,
    pub kind: AttributeKind,
    /// Key of a named element.
    #[serde(default)]
    pub key: String,
    /// Display text: the content, or the referent's name.
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub date_value: Option<NaiveDate>,
    #[serde(default)]
    pub referral_id: Option<u64>,
    pub is_readable: bool,
}

impl DocAttr {
    pub fn field(&self) -> FieldRef<'_> {
        FieldRef {
            value: &self.value,
            key: &self.key,
            date: self.date_value,
        }
    }
}

impl EntryDocument {
    /// Rows of the attribute named `name`.
    pub fn rows<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DocAttr> + 'a {
        self.attrs.iter().filter(move |a| a.name == name)
    }

    /// Entries this document references through object-kind rows.
    pub fn referral_ids(&self) -> Vec<EntryId> {
        self.attrs
            .iter()
            .filter(|a| a.kind.refers_entries())
            .filter_map(|a| a.referral_id.map(EntryId))
            .collect()
    }
}

/// Cut `value` to at most `max` bytes without splitting a character.
pub fn truncate_utf8(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Date carried by free text that starts like `YYYY-MM-DD` or `YYYY/MM/DD`.
pub fn detect_date(value: &str) -> Option<NaiveDate> {
    let caps = DATE_LIKE.captures(value)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

impl<B: StorageBackend> Catalog<B> {
    /// Build the search document of an entry.
    ///
    /// Every active schema attribute gets at least one row, materialized or
    /// not, so blank-match queries see it.
    pub fn build_document(&self, entry: &Entry) -> Result<EntryDocument> {
        let entity = self.entity_or_err(entry.entity_id)?;
        let mut rows = Vec::new();
        for schema in self.active_schema_attrs(entity.id)? {
            let attr = self.active_attribute(entry, schema.id)?;
            let latest = match &attr {
                Some(attr) => self.latest_value_for(attr, &schema, true)?,
                None => None,
            };
            let blank = DocAttr {
                name: schema.name.clone(),
                schema_id: schema.id,
                kind: schema.kind,
                key: String::new(),
                value: String::new(),
                date_value: None,
                referral_id: None,
                is_readable: schema.acl.is_readable_by_default()
                    && attr.as_ref().map_or(true, |a| a.acl.is_readable_by_default()),
            };

            let Some(latest) = latest else {
                rows.push(blank);
                continue;
            };
            if schema.kind.is_array() {
                let before = rows.len();
                for child in self.store().children_of(latest.id)? {
                    if let Some(row) = self.fill_row(blank.clone(), schema.kind.element(), &child)? {
                        rows.push(row);
                    }
                }
                if rows.len() == before {
                    rows.push(blank);
                }
            } else {
                let row = self.fill_row(blank.clone(), schema.kind, &latest)?;
                rows.push(row.unwrap_or(blank));
            }
        }

        Ok(EntryDocument {
            entity: Referent::new(entity.id, entity.name),
            name: entry.name.clone(),
            attrs: rows,
            is_readable: entry.acl.is_readable_by_default(),
        })
    }

    /// Decode one stored value into a row. `None` when it no longer carries
    /// live content (a dangling reference).
    fn fill_row(&self, mut row: DocAttr, kind: AttributeKind, value: &Value) -> Result<Option<DocAttr>> {
        let max = self.config().max_term_size;
        if kind.is_named() {
            row.key = truncate_utf8(&value.text, max).to_string();
            if let Some(referent) = self.live_entry(value.referral)? {
                row.value = truncate_utf8(&referent.name, max).to_string();
                row.referral_id = Some(referent.id);
            }
            let live = !row.key.is_empty() || row.referral_id.is_some();
            return Ok(live.then_some(row));
        }

        match kind.base_kind() {
            BaseKind::String | BaseKind::Text => {
                row.value = truncate_utf8(&value.text, max).to_string();
                row.date_value = detect_date(&value.text);
            }
            BaseKind::Boolean => row.value = value.boolean.to_string(),
            BaseKind::Date => row.date_value = value.date,
            BaseKind::Object => match self.live_entry(value.referral)? {
                Some(referent) => {
                    row.value = truncate_utf8(&referent.name, max).to_string();
                    row.referral_id = Some(referent.id);
                }
                None => return Ok(None),
            },
            BaseKind::Group | BaseKind::Role => {
                let principal = match (principal_kind(kind), value.text.parse::<u64>()) {
                    (Some(kind), Ok(id)) => self.store().principal(kind, PrincipalId(id))?,
                    _ => None,
                };
                match principal.filter(|p| p.is_active) {
                    Some(p) => {
                        row.value = truncate_utf8(&p.name, max).to_string();
                        row.referral_id = Some(p.id.0);
                    }
                    None => return Ok(None),
                }
            }
        }
        Ok(Some(row))
    }

    fn live_entry(&self, id: Option<EntryId>) -> Result<Option<Referent>> {
        let Some(id) = id else {
            return Ok(None);
        };
        Ok(self
            .store()
            .entry(id)?
            .filter(|e| e.is_active)
            .map(|e| Referent::new(e.id, e.name)))
    }

    /// Index the entry's current document, or drop it when the entry is
    /// inactive. Index failures are logged and never propagate.
    pub fn publish_entry(&self, entry: &Entry) {
        if !entry.is_active {
            self.unpublish_entry(entry.id);
            return;
        }
        let outcome = self.build_document(entry).and_then(|doc| {
            self.index().index(ENTRY_DOC_TYPE, entry.id.0, &doc)?;
            self.index().refresh()
        });
        match outcome {
            Ok(()) => debug!(entry = %entry.id, "entry published"),
            Err(e) => warn!(entry = %entry.id, error = %e, "failed to publish entry"),
        }
    }

    pub fn unpublish_entry(&self, id: EntryId) {
        let outcome = self
            .index()
            .delete(ENTRY_DOC_TYPE, id.0)
            .and_then(|_| self.index().refresh());
        if let Err(e) = outcome {
            warn!(entry = %id, error = %e, "failed to unpublish entry");
        }
    }

    /// Republish every live entry referring to `id`.
    pub(crate) fn publish_referrers(&self, id: EntryId) -> Result<()> {
        for referrer in self.live_referrers(id)? {
            self.publish_entry(&referrer);
        }
        Ok(())
    }

    /// Rebuild the index from the store. Returns the number of documents
    /// published.
    pub fn reindex(&self) -> Result<usize> {
        let mut published = 0;
        for entity in self.store().entities()? {
            for entry in self.store().entries_of(entity.id)? {
                if entity.is_active && entry.is_active {
                    self.publish_entry(&entry);
                    published += 1;
                } else {
                    self.unpublish_entry(entry.id);
                }
            }
        }
        debug!(published, "index rebuilt");
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::search::MemIndex;
    use crate::store::MemBackend;
    use crate::test_utils::Fixture;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_utf8("abc", 10), "abc");
        assert_eq!(truncate_utf8("héllo", 2), "h");
        assert_eq!(truncate_utf8("héllo", 3), "hé");
    }

    #[test]
    fn detects_date_like_text() {
        assert_eq!(detect_date("2024/3/9 rollout"), NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(detect_date("2024-13-01"), None);
        assert_eq!(detect_date("rack 2024-01-01"), None);
    }

    #[test]
    fn empty_array_projects_one_blank_row() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({}));
        let doc = fx.catalog.build_document(&server).unwrap();
        let rows: Vec<_> = doc.rows("ports").collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].value.is_empty());
        assert!(rows[0].field().value.is_empty());
    }

    #[test]
    fn unmaterialized_attributes_still_project() {
        let fx = Fixture::new();
        let bare = Entry::new(
            EntryId(fx.store().next_id().unwrap()),
            fx.entity("Server"),
            "bare",
            &fx.admin,
        );
        fx.store().insert_entry(&bare).unwrap();
        let doc = fx.catalog.build_document(&bare).unwrap();
        let names: Vec<_> = doc.attrs.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"hostname"));
        assert!(names.contains(&"nics"));
    }

    #[test]
    fn arrays_project_live_children_only() {
        let fx = Fixture::new();
        let a = fx.create("Network", "net-a", json!({}));
        let b = fx.create("Network", "net-b", json!({}));
        let server = fx.create(
            "Server",
            "web-01",
            json!({"uplink": {"name": "eth0", "id": b.id.0}, "links": [a.id.0, b.id.0]}),
        );
        let mut gone = fx.entry(&a);
        gone.is_active = false;
        fx.store().update_entry(&gone).unwrap();

        let doc = fx.catalog.build_document(&fx.entry(&server)).unwrap();
        let links: Vec<_> = doc.rows("links").map(|r| r.value.as_str()).collect();
        assert_eq!(links, vec!["net-b"]);
        let uplink = doc.rows("uplink").next().unwrap();
        assert_eq!(uplink.key, "eth0");
        assert_eq!(uplink.referral_id, Some(b.id.0));
    }

    #[test]
    fn overlong_text_is_truncated() {
        let config = CatalogConfig {
            max_term_size: 4,
            ..CatalogConfig::default()
        };
        let fx = Fixture::with_catalog(Catalog::new(MemBackend::new()).with_config(config));
        let server = fx.create("Server", "web-01", json!({"note": "abcdefgh", "installed": "2022-02-02"}));
        let doc = fx.catalog.build_document(&server).unwrap();
        assert_eq!(doc.rows("note").next().unwrap().value, "abcd");
        assert_eq!(
            doc.rows("installed").next().unwrap().date_value,
            NaiveDate::from_ymd_opt(2022, 2, 2)
        );
    }

    #[test]
    fn index_outage_does_not_fail_writes() {
        let index = Arc::new(MemIndex::new());
        let fx = Fixture::with_catalog(Catalog::new(MemBackend::new()).with_index(index.clone()));
        index.set_unavailable(true);
        let server = fx.create("Server", "web-01", json!({"hostname": "web"}));
        assert_eq!(fx.value_of(&server, "hostname"), json!("web"));

        index.set_unavailable(false);
        assert_eq!(fx.catalog.reindex().unwrap(), 1);
        assert_eq!(index.len(ENTRY_DOC_TYPE), 1);
    }
}
