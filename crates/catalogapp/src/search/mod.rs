//! # Search Projection
//!
//! Entries are projected into denormalized [`EntryDocument`]s and published
//! to a [`SearchIndex`]. Publication is eventually consistent with the store:
//! it happens after the write that triggered it, and a failed publication is
//! logged without undoing that write.
//!
//! Searches run in three steps:
//!
//! 1. [`Catalog::translate`] turns hints into one [`IndexQuery`] per entity
//! 2. the index narrows candidates
//! 3. [`Catalog::reconcile`] re-reads liveness, permissions and values
//!
//! [`Catalog::translate`]: crate::catalog::Catalog::translate
//! [`Catalog::reconcile`]: crate::catalog::Catalog::reconcile

pub mod document;
pub mod index;
pub mod query;
pub mod results;

pub use document::{detect_date, truncate_utf8, DocAttr, EntryDocument};
pub use index::{Hit, Hits, MemIndex, SearchIndex, ENTRY_DOC_TYPE};
pub use query::{AttrClause, AttrHint, IndexQuery, OutputAttr, ReferralFilter, TranslatedQuery};
pub use results::{ResultAttr, SearchRequest, SearchResult, SearchResults, SimpleHit, SimpleResults};
