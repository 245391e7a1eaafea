//! # Catalogapp Architecture
//!
//! Catalogapp is a **versioned attribute-value engine** for catalog and CMDB
//! style inventories. Administrators define entities (schemas) with typed
//! attributes; entries are instances of entities; every write to an attribute
//! appends an immutable value and moves the "latest" pointer.
//!
//! It is a library that happens to have a CLI client (the `catalog` crate).
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Parses selectors, carries the acting user                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - One user-level action per module, structured CmdResult   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engine (entries/, engine/, search/, values/)               │
//! │  - Entry aggregate, attribute engine, search projection     │
//! │  - Implemented as `impl Catalog` blocks                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - Abstract StorageBackend trait                            │
//! │  - FsBackend (production), MemBackend (testing)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The search index sits beside the store behind the [`search::SearchIndex`]
//! trait. It is eventually consistent and only narrows candidates; results
//! are always re-checked against the store.
//!
//! ## No I/O Assumptions in Core
//!
//! Nothing in this crate writes to stdout/stderr or exits the process.
//! Diagnostics go through `tracing`; the binary decides where they end up.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: User-level actions
//! - [`catalog`]: The [`catalog::Catalog`] handle tying store, index, ACL and config together
//! - [`entries`]: Entry aggregate (create, snapshot, delete/restore, history, referrals)
//! - [`engine`]: Attribute engine (materialize, latest, diff, write, cascade)
//! - [`values`]: Value store (create, clone, render, normalize, validate)
//! - [`attributes`]: Kinds, typed values and the search keyword language
//! - [`search`]: Document projection, query translation, reconciliation
//! - [`schema`]: Schema document loading
//! - [`acl`]: Capability checks
//! - [`store`]: Storage abstraction and implementations
//! - [`model`]: Stored records and ids
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod acl;
pub mod api;
pub mod attributes;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod engine;
pub mod entries;
pub mod error;
pub mod model;
pub mod schema;
pub mod search;
pub mod store;
pub mod values;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
