//! # Configuration
//!
//! Catalog configuration is managed by [`confique`], which resolves every key
//! from layered sources.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `CATALOG_MAX_VALUE_SIZE`, `CATALOG_LOCK_WAIT_MS`, etc.
//! 2. **Data-dir Config**: `catalog.toml` next to the store snapshot.
//! 3. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `max_value_size` | `65536` | Byte ceiling for string, text and named-key payloads |
//! | `max_term_size` | `32766` | Byte ceiling of a projected index term |
//! | `max_history_count` | `30` | Default page size for entry history |
//! | `max_list_entries` | `100` | Default result limit for faceted search |
//! | `max_list_referrals` | `50` | Cap on referral candidate lookups |
//! | `max_results_window` | `10000` | Largest `offset + limit` a simple search accepts |
//! | `lock_wait_ms` | `200` | How long materialization waits on a held key |
//! | `lock_ttl_ms` | `5000` | Age after which a held key is treated as stale |

use crate::error::Result;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "catalog.toml";

/// Configuration for the catalog engine, stored in `catalog.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Byte ceiling for string, text and named-key payloads.
    #[config(env = "CATALOG_MAX_VALUE_SIZE", default = 65536)]
    pub max_value_size: usize,

    /// Byte ceiling of one projected index term.
    #[config(env = "CATALOG_MAX_TERM_SIZE", default = 32766)]
    pub max_term_size: usize,

    #[config(env = "CATALOG_MAX_HISTORY_COUNT", default = 30)]
    pub max_history_count: usize,

    #[config(env = "CATALOG_MAX_LIST_ENTRIES", default = 100)]
    pub max_list_entries: usize,

    #[config(env = "CATALOG_MAX_LIST_REFERRALS", default = 50)]
    pub max_list_referrals: usize,

    /// Largest `offset + limit` accepted by simple search.
    #[config(env = "CATALOG_MAX_RESULTS_WINDOW", default = 10000)]
    pub max_results_window: usize,

    #[config(env = "CATALOG_LOCK_WAIT_MS", default = 200)]
    pub lock_wait_ms: u64,

    #[config(env = "CATALOG_LOCK_TTL_MS", default = 5000)]
    pub lock_ttl_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_value_size: 1 << 16,
            max_term_size: 32766,
            max_history_count: 30,
            max_list_entries: 100,
            max_list_referrals: 50,
            max_results_window: 10000,
            lock_wait_ms: 200,
            lock_ttl_ms: 5000,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from the environment and `<dir>/catalog.toml`.
    /// A missing file is not an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let config = CatalogConfig::builder()
            .env()
            .file(dir.join(CONFIG_FILE))
            .load()?;
        Ok(config)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }
}
