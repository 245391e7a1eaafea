//! Reconciling index hits against the live store.
//!
//! The index is only trusted to narrow candidates. Liveness, permissions and
//! values are always re-read from the store before anything is returned.

use super::index::{Hits, ENTRY_DOC_TYPE};
use super::query::{matching_row, AttrHint, IndexQuery, OutputAttr, ReferralFilter};
use crate::acl::AclLevel;
use crate::attributes::{AttrValue, AttributeKind, FieldRef, KeywordFilter, Referent};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::model::{Actor, EntityId};
use crate::store::StorageBackend;
use crate::values::{render, RenderOptions};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultAttr {
    pub name: String,
    pub kind: AttributeKind,
    pub is_readable: bool,
    pub value: Option<AttrValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub entity: Referent,
    pub entry: Referent,
    pub attrs: Vec<ResultAttr>,
    /// Live referrers; only filled when a referral filter was given.
    pub referrals: Vec<Referent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub total: usize,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub entities: Vec<EntityId>,
    pub attrs: Vec<AttrHint>,
    pub entry_name: String,
    pub referral: Option<ReferralFilter>,
    pub limit: usize,
    /// Report every readable attribute, not only the hinted ones.
    pub output_all: bool,
}

impl SearchRequest {
    pub fn new(entities: Vec<EntityId>, limit: usize) -> Self {
        Self {
            entities,
            attrs: Vec::new(),
            entry_name: String::new(),
            referral: None,
            limit,
            output_all: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleHit {
    pub entity: Referent,
    pub entry: Referent,
    /// The matching attribute, `None` when the entry name matched.
    pub attr: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimpleResults {
    pub total: usize,
    pub results: Vec<SimpleHit>,
}

impl<B: StorageBackend> Catalog<B> {
    /// Turn hits into results, spending one unit of `limit` per result.
    pub fn reconcile(
        &self,
        actor: &Actor,
        hits: &Hits,
        output_attrs: &[OutputAttr],
        limit: &mut usize,
        referral: Option<&ReferralFilter>,
    ) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();
        for hit in &hits.hits {
            if *limit == 0 {
                break;
            }
            let Some(entry) = self.store().entry(hit.id)? else {
                debug!(entry = %hit.id, "stale hit skipped");
                continue;
            };
            if !entry.is_active || !self.can_read_entry(actor, &entry)? {
                continue;
            }
            let entity = self.entity_or_err(entry.entity_id)?;

            let mut referrals = Vec::new();
            if let Some(filter) = referral {
                let referrers = self.live_referrers(entry.id)?;
                let keyword = match filter {
                    ReferralFilter::Any => None,
                    ReferralFilter::Name(name) => KeywordFilter::parse(name, false),
                };
                let matched = referrers
                    .iter()
                    .any(|r| keyword.as_ref().map_or(true, |k| k.matches(&FieldRef::text(&r.name))));
                if !matched {
                    continue;
                }
                referrals = referrers
                    .into_iter()
                    .map(|r| Referent::new(r.id, r.name))
                    .collect();
            }

            let schemas = self.active_schema_attrs(entity.id)?;
            let mut attrs = Vec::new();
            for output in output_attrs {
                let Some(schema) = schemas.iter().find(|s| s.name == output.name) else {
                    continue;
                };
                let attr = self.active_attribute(&entry, schema.id)?;
                let is_readable = output.is_readable
                    && self.can_access_attr(actor, schema, attr.as_ref(), AclLevel::Readable);
                let value = match (&attr, is_readable) {
                    (Some(attr), true) => match self.latest_value_for(attr, schema, true)? {
                        Some(latest) => Some(render(self.store(), &latest, RenderOptions::default())?),
                        None => None,
                    },
                    _ => None,
                };
                attrs.push(ResultAttr {
                    name: schema.name.clone(),
                    kind: schema.kind,
                    is_readable,
                    value,
                });
            }

            results.push(SearchResult {
                entity: Referent::new(entity.id, entity.name),
                entry: Referent::new(entry.id, entry.name),
                attrs,
                referrals,
            });
            *limit -= 1;
        }
        Ok(results)
    }

    /// Advanced search across entities. The limit is shared by all of them;
    /// `total` counts index hits over every entity, past the limit too.
    pub fn search_entries(&self, actor: &Actor, request: &SearchRequest) -> Result<SearchResults> {
        let mut limit = request.limit;
        let mut found = SearchResults::default();
        for translated in self.translate(
            actor,
            &request.entities,
            &request.attrs,
            &request.entry_name,
            request.output_all,
        )? {
            let Some(hits) = self.index().query(ENTRY_DOC_TYPE, &translated.query)? else {
                continue;
            };
            found.total += hits.total;
            if limit == 0 {
                continue;
            }
            let results = self.reconcile(
                actor,
                &hits,
                &translated.output_attrs,
                &mut limit,
                request.referral.as_ref(),
            )?;
            found.results.extend(results);
        }
        Ok(found)
    }

    /// Keyword search over entry names and default-readable attribute values.
    ///
    /// Returns nothing once `offset + limit` passes the result window.
    pub fn search_simple(
        &self,
        actor: &Actor,
        keyword: &str,
        exclude_entities: &[EntityId],
        limit: usize,
        offset: usize,
    ) -> Result<SimpleResults> {
        if offset.saturating_add(limit) > self.config().max_results_window {
            return Ok(SimpleResults::default());
        }
        let Some(filter) = KeywordFilter::parse(keyword, false) else {
            return Ok(SimpleResults::default());
        };
        let query = IndexQuery {
            exclude_entity_ids: exclude_entities.to_vec(),
            any_field: Some(filter.clone()),
            from: offset,
            size: limit,
            ..IndexQuery::default()
        };
        let Some(hits) = self.index().query(ENTRY_DOC_TYPE, &query)? else {
            return Ok(SimpleResults::default());
        };

        let mut results = Vec::new();
        for hit in &hits.hits {
            let Some(entry) = self.store().entry(hit.id)? else {
                continue;
            };
            if !entry.is_active || !self.can_read_entry(actor, &entry)? {
                continue;
            }
            let row = if filter.matches(&FieldRef::text(&entry.name)) {
                None
            } else {
                matching_row(&hit.document, &filter)
            };
            results.push(SimpleHit {
                entity: hit.document.entity.clone(),
                entry: Referent::new(entry.id, entry.name),
                attr: row.map(|r| r.name.clone()),
                value: row.map(|r| r.value.clone()),
            });
        }
        Ok(SimpleResults {
            total: hits.total,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{AclInfo, AclTable};
    use crate::model::ActorId;
    use crate::search::MemIndex;
    use crate::store::MemBackend;
    use crate::test_utils::Fixture;
    use serde_json::json;
    use std::sync::Arc;

    fn servers(fx: &Fixture) {
        fx.create("Server", "web-01", json!({"hostname": "web-01.tokyo", "ports": ["80"]}));
        fx.create("Server", "web-02", json!({"hostname": "web-02.osaka", "ports": ["80", "443"]}));
        fx.create("Server", "db-01", json!({"hostname": "db-01.tokyo"}));
    }

    fn names(results: &SearchResults) -> Vec<&str> {
        results.results.iter().map(|r| r.entry.name.as_str()).collect()
    }

    #[test]
    fn advanced_search_filters_by_hints() {
        let fx = Fixture::new();
        servers(&fx);
        let mut request = SearchRequest::new(vec![fx.entity("Server")], 10);
        request.attrs = vec![AttrHint::new("hostname").with_keyword("tokyo")];
        let found = fx.catalog.search_entries(&fx.admin, &request).unwrap();
        assert_eq!(names(&found), vec!["db-01", "web-01"]);
        let hostname = found.results[0].attrs.iter().find(|a| a.name == "hostname").unwrap();
        assert_eq!(hostname.value, Some(AttrValue::Text("db-01.tokyo".into())));

        request.attrs = vec![AttrHint::new("ports").with_keyword("\\")];
        let found = fx.catalog.search_entries(&fx.admin, &request).unwrap();
        assert_eq!(names(&found), vec!["db-01"]);
    }

    #[test]
    fn limit_is_shared_across_entities() {
        let fx = Fixture::new();
        servers(&fx);
        fx.create("Network", "net-a", json!({}));
        let request = SearchRequest::new(vec![fx.entity("Network"), fx.entity("Server")], 2);
        let found = fx.catalog.search_entries(&fx.admin, &request).unwrap();
        assert_eq!(found.total, 4);
        assert_eq!(names(&found), vec!["net-a", "db-01"]);
    }

    #[test]
    fn stale_documents_are_not_returned() {
        let fx = Fixture::new();
        servers(&fx);
        let db = fx.catalog.find_active_entry(fx.entity("Server"), "db-01").unwrap().unwrap();
        let mut gone = db.clone();
        gone.is_active = false;
        fx.store().update_entry(&gone).unwrap();

        let request = SearchRequest::new(vec![fx.entity("Server")], 10);
        let found = fx.catalog.search_entries(&fx.admin, &request).unwrap();
        assert_eq!(names(&found), vec!["web-01", "web-02"]);
    }

    #[test]
    fn permissions_are_rechecked_on_hits() {
        let acl = Arc::new(AclTable::new());
        let fx = Fixture::with_catalog(Catalog::new(MemBackend::new()).with_permissions(acl));
        servers(&fx);
        let db = fx.catalog.find_active_entry(fx.entity("Server"), "db-01").unwrap().unwrap();
        let mut hidden = db.clone();
        hidden.acl = AclInfo::private();
        fx.store().update_entry(&hidden).unwrap();

        let guest = Actor::new(ActorId(5), "guest");
        let request = SearchRequest::new(vec![fx.entity("Server")], 10);
        let found = fx.catalog.search_entries(&guest, &request).unwrap();
        assert_eq!(names(&found), vec!["web-01", "web-02"]);
    }

    #[test]
    fn referral_filter_requires_live_referrer() {
        let fx = Fixture::new();
        let a = fx.create("Network", "net-a", json!({}));
        fx.create("Network", "net-b", json!({}));
        fx.create("Server", "web-01", json!({"network": a.id.0}));

        let mut request = SearchRequest::new(vec![fx.entity("Network")], 10);
        request.referral = Some(ReferralFilter::Any);
        let found = fx.catalog.search_entries(&fx.admin, &request).unwrap();
        assert_eq!(names(&found), vec!["net-a"]);
        assert_eq!(found.results[0].referrals[0].name, "web-01");

        request.referral = Some(ReferralFilter::Name("db".into()));
        assert!(fx.catalog.search_entries(&fx.admin, &request).unwrap().results.is_empty());
    }

    #[test]
    fn missing_index_means_no_results() {
        let fx = Fixture::new();
        let request = SearchRequest::new(vec![fx.entity("Server")], 10);
        assert_eq!(fx.catalog.search_entries(&fx.admin, &request).unwrap().total, 0);
    }

    #[test]
    fn index_outage_surfaces_on_query() {
        let index = Arc::new(MemIndex::new());
        let fx = Fixture::with_catalog(Catalog::new(MemBackend::new()).with_index(index.clone()));
        servers(&fx);
        index.set_unavailable(true);
        let request = SearchRequest::new(vec![fx.entity("Server")], 10);
        assert!(matches!(
            fx.catalog.search_entries(&fx.admin, &request),
            Err(crate::error::CatalogError::IndexUnavailable(_))
        ));
    }

    #[test]
    fn simple_search_reports_matching_attribute() {
        let fx = Fixture::new();
        servers(&fx);
        let found = fx.catalog.search_simple(&fx.admin, "osaka", &[], 10, 0).unwrap();
        assert_eq!(found.results.len(), 1);
        assert_eq!(found.results[0].entry.name, "web-02");
        assert_eq!(found.results[0].attr.as_deref(), Some("hostname"));

        let found = fx.catalog.search_simple(&fx.admin, "db-01", &[], 10, 0).unwrap();
        assert_eq!(found.results[0].attr, None);

        let window = fx.catalog.config().max_results_window;
        assert!(fx
            .catalog
            .search_simple(&fx.admin, "web", &[], 10, window)
            .unwrap()
            .results
            .is_empty());
    }
}
