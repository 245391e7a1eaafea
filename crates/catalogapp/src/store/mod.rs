//! # Storage Layer
//!
//! The [`StorageBackend`] trait is the boundary to the relational store that
//! holds schema records, entries, attributes and value histories. The engine
//! only talks to this trait, and every method is a self-contained atomic
//! step: there are no cross-call transactions.
//!
//! ## Atomicity Contract
//!
//! The engine relies on three primitives being atomic:
//!
//! - [`StorageBackend::insert_attribute`]: insert + link into the entry
//! - [`StorageBackend::insert_values`]: a container and its children land together
//! - [`StorageBackend::promote_latest`]: latest switchover for one attribute
//!
//! Everything else (duplicate attributes, stale kinds) is repaired by the
//! engine after the fact.
//!
//! ## Weak References
//!
//! `Value.referral` is a weak pointer to an entry. Soft-deleting the entry
//! leaves it in place (readers check liveness). Destroying the entry clears it.
//!
//! ## Implementations
//!
//! - [`MemBackend`]: all tables in memory behind one `RwLock`.
//! - [`FsBackend`]: `MemBackend` plus an atomic JSON snapshot after every mutation.
//!
//! ## Storage Layout
//!
//! ```text
//! <data dir>/
//! ├── catalog.json    # Table snapshot
//! └── catalog.toml    # Optional configuration
//! ```

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

pub use backend::StorageBackend;
pub use fs_backend::FsBackend;
pub use mem_backend::{MemBackend, Tables};
