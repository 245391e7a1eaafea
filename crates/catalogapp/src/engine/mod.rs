//! # Attribute Engine
//!
//! Per-attribute operations over the value store, implemented on [`Catalog`]:
//!
//! | Operation | Module |
//! |-----------|--------|
//! | `ensure_attribute`, `dedup_attributes` | `materialize` |
//! | `latest_value` | `latest` |
//! | `is_changed` | `diff` |
//! | `write`, `append`, `remove` | `write` |
//! | `delete_cascade`, `restore_cascade`, `detect_restore_collision` | `cascade` |
//!
//! ## Invariants
//!
//! - Once `write` returns, exactly one top-level value of the attribute is latest.
//! - Every write path consults `is_changed` first; unchanged content never
//!   produces a version.
//! - At most one active attribute per (entry, schema attribute) survives a
//!   materialization. The keyed lock narrows the race; the dedup pass closes it.
//!
//! [`Catalog`]: crate::catalog::Catalog

mod cascade;
mod diff;
mod latest;
pub mod lock;
mod materialize;
mod write;

pub use write::encode_element;
