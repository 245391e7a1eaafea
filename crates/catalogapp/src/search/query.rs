//! Translation of search hints into index queries.

use super::document::{DocAttr, EntryDocument};
use crate::acl::AclLevel;
use crate::attributes::{FieldRef, KeywordFilter};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::model::{Actor, EntityId};
use crate::store::StorageBackend;
use serde::{Deserialize, Serialize};

/// One attribute the caller wants to filter on and/or see in results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrHint {
    pub name: String,
    #[serde(default)]
    pub keyword: Option<String>,
    /// Match the keyword exactly instead of as a substring.
    #[serde(default)]
    pub exact: bool,
}

impl AttrHint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyword: None,
            exact: false,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }
}

/// Restrict results to entries something refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralFilter {
    /// At least one live referrer.
    Any,
    /// A live referrer whose name matches the keyword.
    Name(String),
}

/// Condition on the rows of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrClause {
    pub name: String,
    pub filter: KeywordFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    /// Empty means every entity.
    pub entity_ids: Vec<EntityId>,
    pub exclude_entity_ids: Vec<EntityId>,
    pub entry_name: Option<KeywordFilter>,
    /// All clauses must hold.
    pub attrs: Vec<AttrClause>,
    /// Matches the entry name or any default-readable row.
    pub any_field: Option<KeywordFilter>,
    pub from: usize,
    pub size: usize,
}

impl Default for IndexQuery {
    fn default() -> Self {
        Self {
            entity_ids: Vec::new(),
            exclude_entity_ids: Vec::new(),
            entry_name: None,
            attrs: Vec::new(),
            any_field: None,
            from: 0,
            size: usize::MAX,
        }
    }
}

impl IndexQuery {
    pub fn matches(&self, doc: &EntryDocument) -> bool {
        let entity = EntityId(doc.entity.id);
        if !self.entity_ids.is_empty() && !self.entity_ids.contains(&entity) {
            return false;
        }
        if self.exclude_entity_ids.contains(&entity) {
            return false;
        }
        if let Some(filter) = &self.entry_name {
            if !filter.matches(&FieldRef::text(&doc.name)) {
                return false;
            }
        }
        if let Some(filter) = &self.any_field {
            let name_hit = filter.matches(&FieldRef::text(&doc.name));
            if !name_hit && matching_row(doc, filter).is_none() {
                return false;
            }
        }
        self.attrs.iter().all(|clause| {
            let mut rows = doc.rows(&clause.name).peekable();
            if rows.peek().is_none() {
                return clause.filter.matches(&FieldRef::default());
            }
            clause.filter.matches_any(rows.map(DocAttr::field))
        })
    }
}

/// First default-readable row satisfying `filter`.
pub fn matching_row<'a>(doc: &'a EntryDocument, filter: &KeywordFilter) -> Option<&'a DocAttr> {
    doc.attrs
        .iter()
        .filter(|row| row.is_readable)
        .find(|row| filter.matches(&row.field()))
}

/// An attribute reported in results, with the actor's schema-level
/// readability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputAttr {
    pub name: String,
    pub is_readable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub entity: EntityId,
    pub query: IndexQuery,
    pub output_attrs: Vec<OutputAttr>,
}

impl<B: StorageBackend> Catalog<B> {
    /// One query per readable entity. Hints on attributes the actor cannot
    /// read are dropped from the conditions but stay listed as unreadable
    /// outputs, so `output_all` does not add them back.
    pub fn translate(
        &self,
        actor: &Actor,
        entity_ids: &[EntityId],
        hints: &[AttrHint],
        entry_name: &str,
        output_all: bool,
    ) -> Result<Vec<TranslatedQuery>> {
        let mut translated = Vec::new();
        for id in entity_ids {
            let Some(entity) = self.store().entity(*id)? else {
                continue;
            };
            if !entity.is_active || !self.can(actor, entity.id, &entity.acl, AclLevel::Readable) {
                continue;
            }
            let schemas = self.active_schema_attrs(entity.id)?;

            let mut clauses = Vec::new();
            let mut outputs: Vec<OutputAttr> = Vec::new();
            for hint in hints {
                let readable = schemas
                    .iter()
                    .find(|s| s.name == hint.name)
                    .is_some_and(|s| self.can(actor, s.id, &s.acl, AclLevel::Readable));
                if !outputs.iter().any(|o| o.name == hint.name) {
                    outputs.push(OutputAttr {
                        name: hint.name.clone(),
                        is_readable: readable,
                    });
                }
                if !readable {
                    continue;
                }
                if let Some(filter) = hint
                    .keyword
                    .as_deref()
                    .and_then(|k| KeywordFilter::parse(k, hint.exact))
                {
                    clauses.push(AttrClause {
                        name: hint.name.clone(),
                        filter,
                    });
                }
            }
            if output_all {
                for schema in &schemas {
                    if !outputs.iter().any(|o| o.name == schema.name) {
                        outputs.push(OutputAttr {
                            name: schema.name.clone(),
                            is_readable: self.can(actor, schema.id, &schema.acl, AclLevel::Readable),
                        });
                    }
                }
            }

            translated.push(TranslatedQuery {
                entity: entity.id,
                query: IndexQuery {
                    entity_ids: vec![entity.id],
                    entry_name: KeywordFilter::parse(entry_name, false),
                    attrs: clauses,
                    size: self.config().max_results_window,
                    ..IndexQuery::default()
                },
                output_attrs: outputs,
            });
        }
        Ok(translated)
    }
}
