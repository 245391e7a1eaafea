use super::document::EntryDocument;
use super::query::IndexQuery;
use crate::error::{CatalogError, Result};
use crate::model::EntryId;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

pub const ENTRY_DOC_TYPE: &str = "entry";

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: EntryId,
    pub document: EntryDocument,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hits {
    /// Matches before pagination.
    pub total: usize,
    pub hits: Vec<Hit>,
}

/// The external search index the projection is published to.
///
/// The index is a denormalized cache: callers never use it for authorization
/// and tolerate it lagging behind or failing independently of the store.
pub trait SearchIndex: Send + Sync {
    fn index(&self, doc_type: &str, id: u64, document: &EntryDocument) -> Result<()>;

    /// Deleting a missing document is not an error.
    fn delete(&self, doc_type: &str, id: u64) -> Result<()>;

    fn get(&self, doc_type: &str, id: u64) -> Result<Option<EntryDocument>>;

    /// `Ok(None)` when the doc type does not exist yet; callers treat that as
    /// no results.
    fn query(&self, doc_type: &str, query: &IndexQuery) -> Result<Option<Hits>>;

    fn refresh(&self) -> Result<()>;
}

/// In-process index. Hits are ordered by entry name, then id.
#[derive(Debug, Default)]
pub struct MemIndex {
    docs: RwLock<HashMap<String, BTreeMap<u64, EntryDocument>>>,
    unavailable: AtomicBool,
}

impl MemIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`CatalogError::IndexUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self, doc_type: &str) -> usize {
        self.docs
            .read()
            .map(|docs| docs.get(doc_type).map_or(0, |d| d.len()))
            .unwrap_or(0)
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CatalogError::IndexUnavailable("index is unavailable".to_string()));
        }
        Ok(())
    }

    fn poisoned<E>(_: E) -> CatalogError {
        CatalogError::IndexUnavailable("index lock poisoned".to_string())
    }
}

impl SearchIndex for MemIndex {
    fn index(&self, doc_type: &str, id: u64, document: &EntryDocument) -> Result<()> {
        self.check()?;
        let mut docs = self.docs.write().map_err(Self::poisoned)?;
        docs.entry(doc_type.to_string())
            .or_default()
            .insert(id, document.clone());
        Ok(())
    }

    fn delete(&self, doc_type: &str, id: u64) -> Result<()> {
        self.check()?;
        let mut docs = self.docs.write().map_err(Self::poisoned)?;
        if let Some(docs) = docs.get_mut(doc_type) {
            docs.remove(&id);
        }
        Ok(())
    }

    fn get(&self, doc_type: &str, id: u64) -> Result<Option<EntryDocument>> {
        self.check()?;
        let docs = self.docs.read().map_err(Self::poisoned)?;
        Ok(docs.get(doc_type).and_then(|d| d.get(&id)).cloned())
    }

    fn query(&self, doc_type: &str, query: &IndexQuery) -> Result<Option<Hits>> {
        self.check()?;
        let docs = self.docs.read().map_err(Self::poisoned)?;
        let Some(docs) = docs.get(doc_type) else {
            return Ok(None);
        };
        let mut matched: Vec<Hit> = docs
            .iter()
            .filter(|(_, doc)| query.matches(doc))
            .map(|(id, doc)| Hit {
                id: EntryId(*id),
                document: doc.clone(),
            })
            .collect();
        matched.sort_by(|a, b| a.document.name.cmp(&b.document.name).then(a.id.cmp(&b.id)));
        let total = matched.len();
        let hits = matched.into_iter().skip(query.from).take(query.size).collect();
        Ok(Some(Hits { total, hits }))
    }

    fn refresh(&self) -> Result<()> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{KeywordFilter, Referent};
    use crate::model::EntityId;

    fn doc(name: &str) -> EntryDocument {
        EntryDocument {
            entity: Referent::new(EntityId(1), "Server"),
            name: name.to_string(),
            attrs: Vec::new(),
            is_readable: true,
        }
    }

    #[test]
    fn missing_doc_type_is_none() {
        let index = MemIndex::new();
        assert!(index.query(ENTRY_DOC_TYPE, &IndexQuery::default()).unwrap().is_none());
    }

    #[test]
    fn query_sorts_and_paginates() {
        let index = MemIndex::new();
        for (id, name) in [(3, "c"), (1, "a"), (2, "b")] {
            index.index(ENTRY_DOC_TYPE, id, &doc(name)).unwrap();
        }
        let query = IndexQuery {
            from: 1,
            size: 1,
            ..IndexQuery::default()
        };
        let hits = index.query(ENTRY_DOC_TYPE, &query).unwrap().unwrap();
        assert_eq!(hits.total, 3);
        assert_eq!(hits.hits.len(), 1);
        assert_eq!(hits.hits[0].document.name, "b");

        let query = IndexQuery {
            entry_name: KeywordFilter::parse("c", false),
            ..IndexQuery::default()
        };
        let hits = index.query(ENTRY_DOC_TYPE, &query).unwrap().unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.hits[0].id, EntryId(3));
    }

    #[test]
    fn delete_and_outage() {
        let index = MemIndex::new();
        index.index(ENTRY_DOC_TYPE, 1, &doc("a")).unwrap();
        index.delete(ENTRY_DOC_TYPE, 1).unwrap();
        index.delete(ENTRY_DOC_TYPE, 1).unwrap();
        assert_eq!(index.len(ENTRY_DOC_TYPE), 0);

        index.set_unavailable(true);
        assert!(matches!(
            index.index(ENTRY_DOC_TYPE, 1, &doc("a")),
            Err(CatalogError::IndexUnavailable(_))
        ));
    }
}
