use crate::acl::AclLevel;
use crate::attributes::{BaseKind, FieldRef, KeywordFilter, Referent};
use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use crate::model::{Actor, AttributeId, EntityAttr, EntityAttrId, EntityId, Entry, EntryId};
use crate::store::StorageBackend;
use crate::values::principal_kind;
use serde::Serialize;
use std::collections::BTreeSet;

/// Schema scoping for reverse-reference lookups. Empty include means all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferrerFilter {
    pub include_entities: Vec<EntityId>,
    pub exclude_entities: Vec<EntityId>,
}

impl ReferrerFilter {
    fn allows(&self, entity: EntityId) -> bool {
        (self.include_entities.is_empty() || self.include_entities.contains(&entity))
            && !self.exclude_entities.contains(&entity)
    }
}

/// Something a reference attribute may point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: u64,
    pub name: String,
    /// Schema of an entry candidate; `None` for groups and roles.
    pub entity: Option<Referent>,
}

impl<B: StorageBackend> Catalog<B> {
    /// Active entries other than `id` whose latest value of an active
    /// attribute points at `id`, sorted by name.
    pub fn live_referrers(&self, id: EntryId) -> Result<Vec<Entry>> {
        let mut seen = BTreeSet::new();
        let mut referrers = Vec::new();
        for value in self.store().values_referring(id)? {
            let top = match value.parent_value {
                Some(parent) => match self.store().value(parent)? {
                    Some(container) => container,
                    None => continue,
                },
                None => value,
            };
            if !top.is_latest {
                continue;
            }
            let Some(attr) = self.store().attribute(top.attribute_id)? else {
                continue;
            };
            if !attr.is_active || attr.entry_id == id {
                continue;
            }
            let current_kind = self
                .store()
                .entity_attr(attr.schema_id)?
                .filter(|s| s.is_active)
                .map(|s| s.kind);
            if current_kind != Some(top.kind) || !seen.insert(attr.entry_id) {
                continue;
            }
            if let Some(entry) = self.store().entry(attr.entry_id)? {
                if entry.is_active {
                    referrers.push(entry);
                }
            }
        }
        referrers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(referrers)
    }

    /// [`Catalog::live_referrers`] scoped by referrer schema.
    pub fn reverse_referents(&self, entry: &Entry, filter: &ReferrerFilter) -> Result<Vec<Entry>> {
        Ok(self
            .live_referrers(entry.id)?
            .into_iter()
            .filter(|r| filter.allows(r.entity_id))
            .collect())
    }

    /// Referrers the actor can read, optionally narrowed by a name keyword,
    /// capped at the referral listing limit.
    pub fn referrers(
        &self,
        entry: &Entry,
        filter: &ReferrerFilter,
        keyword: Option<&str>,
        actor: &Actor,
    ) -> Result<Vec<Entry>> {
        let keyword = keyword.and_then(|k| KeywordFilter::parse(k, false));
        let mut visible = Vec::new();
        for referrer in self.reverse_referents(entry, filter)? {
            if visible.len() >= self.config().max_list_referrals {
                break;
            }
            if keyword
                .as_ref()
                .is_some_and(|k| !k.matches(&FieldRef::text(&referrer.name)))
            {
                continue;
            }
            if self.can_read_entry(actor, &referrer)? {
                visible.push(referrer);
            }
        }
        Ok(visible)
    }

    /// Records a reference attribute may point at. `id` names either a
    /// materialized attribute or a schema attribute. Kinds that hold no
    /// references have no candidates.
    pub fn referral_candidates(&self, id: u64, keyword: Option<&str>, actor: &Actor) -> Result<Vec<Candidate>> {
        let schema = self.candidate_schema(id)?;
        let keyword = keyword.and_then(|k| KeywordFilter::parse(k, false));
        let wanted = |name: &str| keyword.as_ref().map_or(true, |k| k.matches(&FieldRef::text(name)));

        let mut candidates = Vec::new();
        match schema.kind.base_kind() {
            BaseKind::Object => {
                let entities = if schema.referral.is_empty() {
                    self.store().entities()?
                } else {
                    let mut entities = Vec::new();
                    for id in &schema.referral {
                        entities.extend(self.store().entity(*id)?);
                    }
                    entities
                };
                for entity in entities.into_iter().filter(|e| e.is_active) {
                    if !self.can(actor, entity.id, &entity.acl, AclLevel::Readable) {
                        continue;
                    }
                    for entry in self.store().entries_of(entity.id)? {
                        if entry.is_active && wanted(&entry.name) && self.can_read_entry(actor, &entry)? {
                            candidates.push(Candidate {
                                id: entry.id.0,
                                name: entry.name,
                                entity: Some(Referent::new(entity.id, entity.name.clone())),
                            });
                        }
                    }
                }
            }
            BaseKind::Group | BaseKind::Role => {
                if let Some(kind) = principal_kind(schema.kind) {
                    for principal in self.store().principals(kind)? {
                        if principal.is_active && wanted(&principal.name) {
                            candidates.push(Candidate {
                                id: principal.id.0,
                                name: principal.name,
                                entity: None,
                            });
                        }
                    }
                }
            }
            _ => return Ok(Vec::new()),
        }
        candidates.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        candidates.truncate(self.config().max_list_referrals);
        Ok(candidates)
    }

    fn candidate_schema(&self, id: u64) -> Result<EntityAttr> {
        if let Some(attr) = self.store().attribute(AttributeId(id))? {
            return self.schema_attr_or_err(attr.schema_id);
        }
        self.store()
            .entity_attr(EntityAttrId(id))?
            .ok_or_else(|| CatalogError::NotFound(format!("attribute {}", id)))
    }
}
