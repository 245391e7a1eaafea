use crate::acl::AclLevel;
use crate::attributes::AttrValue;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::model::{Actor, ActorId, AttributeId, Entry, ValueId};
use crate::store::StorageBackend;
use crate::values::{render, RenderOptions, Value};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryValue {
    pub id: ValueId,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub value: AttrValue,
}

/// One recorded version paired with the version it replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub attr_id: AttributeId,
    pub attribute: String,
    pub current: HistoryValue,
    pub previous: Option<HistoryValue>,
}

impl<B: StorageBackend> Catalog<B> {
    /// Versions of the entry's readable attributes, newest first.
    ///
    /// Blank seed values with nothing before them are left out. Referents
    /// render even when soft-deleted, since history shows what was recorded.
    pub fn history(&self, entry: &Entry, actor: &Actor, count: usize, offset: usize) -> Result<Vec<HistoryRecord>> {
        if !self.can_read_entry(actor, entry)? {
            return Ok(Vec::new());
        }

        let mut versions: Vec<(String, Value, Option<Value>)> = Vec::new();
        for attr in self.store().attributes_of(entry.id)? {
            if !attr.is_active {
                continue;
            }
            let Some(schema) = self.store().entity_attr(attr.schema_id)? else {
                continue;
            };
            if !schema.is_active || !self.can_access_attr(actor, &schema, Some(&attr), AclLevel::Readable) {
                continue;
            }
            let values = self.store().values_of(attr.id)?;
            for (i, value) in values.iter().enumerate() {
                let previous = i.checked_sub(1).map(|p| values[p].clone());
                versions.push((schema.name.clone(), value.clone(), previous));
            }
        }
        versions.sort_by(|a, b| (b.1.created_at, b.1.id).cmp(&(a.1.created_at, a.1.id)));

        let options = RenderOptions::default().including_inactive();
        let mut records = Vec::new();
        let mut skipped = 0;
        for (attribute, value, previous) in versions {
            if records.len() >= count {
                break;
            }
            let current = self.history_value(&value, options)?;
            if previous.is_none() && current.value.is_empty() {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            let previous = match previous {
                Some(previous) => Some(self.history_value(&previous, options)?),
                None => None,
            };
            records.push(HistoryRecord {
                attr_id: value.attribute_id,
                attribute,
                current,
                previous,
            });
        }
        Ok(records)
    }

    fn history_value(&self, value: &Value, options: RenderOptions) -> Result<HistoryValue> {
        Ok(HistoryValue {
            id: value.id,
            created_by: value.created_by,
            created_at: value.created_at,
            value: render(self.store(), value, options)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::attributes::{AttrValue, Referent};
    use crate::test_utils::Fixture;
    use serde_json::json;

    #[test]
    fn history_pairs_versions_newest_first() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"hostname": "a"}));
        let attr = fx.attr(&server, "hostname");
        fx.catalog.write(&attr, &fx.admin, &json!("b")).unwrap();
        fx.catalog.write(&attr, &fx.admin, &json!("c")).unwrap();

        let history = fx.catalog.history(&fx.entry(&server), &fx.admin, 10, 0).unwrap();
        let hostname: Vec<_> = history.iter().filter(|r| r.attribute == "hostname").collect();
        assert_eq!(hostname.len(), 3);
        assert_eq!(hostname[0].current.value, AttrValue::Text("c".into()));
        assert_eq!(
            hostname[0].previous.as_ref().unwrap().value,
            AttrValue::Text("b".into())
        );
        assert!(hostname[2].previous.is_none());
    }

    #[test]
    fn blank_seeds_are_skipped_and_paging_applies() {
        let fx = Fixture::new();
        let server = fx.create("Server", "web-01", json!({"hostname": "a"}));
        let attr = fx.attr(&server, "hostname");
        fx.catalog.write(&attr, &fx.admin, &json!("b")).unwrap();

        let all = fx.catalog.history(&fx.entry(&server), &fx.admin, 10, 0).unwrap();
        assert_eq!(all.len(), 2);
        let page = fx.catalog.history(&fx.entry(&server), &fx.admin, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].current.value, AttrValue::Text("a".into()));
    }

    #[test]
    fn history_renders_deleted_referents() {
        let fx = Fixture::new();
        let net = fx.create("Network", "net-a", json!({}));
        let server = fx.create("Server", "web-01", json!({"uplink": {"name": "eth0", "id": net.id.0}}));
        fx.catalog.soft_delete(net.id, &fx.admin).unwrap();

        let history = fx.catalog.history(&fx.entry(&server), &fx.admin, 10, 0).unwrap();
        let uplink = history.iter().find(|r| r.attribute == "uplink").unwrap();
        let referent = uplink.current.value.as_referent().unwrap();
        assert_eq!(referent, &Referent::new(net.id, fx.entry(&net).name));
    }
}
