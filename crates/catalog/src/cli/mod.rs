//! # CLI Behavior
//!
//! One possible UI client for catalogapp. This is the only place that knows
//! about terminal I/O, exit codes and output formatting.
//!
//! ## Context
//!
//! Every invocation opens the file store under `--data-dir` (or
//! `CATALOG_HOME`, or the platform data directory), loads `catalog.toml`
//! from the same directory, and acts as `--user`.
//!
//! The search index lives in memory, so search commands rebuild it from the
//! store before querying.
//!
//! ## Attribute Input
//!
//! `--attrs '{"hostname": "web-01"}'` passes a JSON object. `--set name=value`
//! adds one attribute; the value is read as JSON when it looks like JSON
//! (`[...]`, `{...}`, `"..."`, `true`, `false`, `null`) and as a plain string
//! otherwise.
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. The filter comes from
//! `CATALOG_LOG` (e.g. `CATALOG_LOG=catalogapp=debug`); without it, `-v`
//! raises the default from `warn` to `info` and `-vv` to `debug`.
//!
//! ## Module Structure
//!
//! - `args`: clap definitions
//! - `render`: terminal output for [`CmdResult`]

mod args;
mod render;

use anyhow::{bail, Context, Result};
use args::{Cli, Commands};
use catalogapp::api::{CatalogApi, CmdResult};
use catalogapp::catalog::Catalog;
use catalogapp::commands::search::SearchArgs;
use catalogapp::config::CatalogConfig;
use catalogapp::schema::SchemaDocument;
use catalogapp::store::FsBackend;
use clap::Parser;
use directories::ProjectDirs;
use serde_json::{Map, Value as Json};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let api = init_api(&cli)?;
    let result = dispatch(&api, cli.command)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render::print_result(&result);
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "catalog=warn,catalogapp=warn",
        1 => "catalog=info,catalogapp=info",
        _ => "catalog=debug,catalogapp=debug",
    };
    let filter = EnvFilter::try_from_env("CATALOG_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn data_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    ProjectDirs::from("", "", "catalog")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("Could not determine a data directory; pass --data-dir")
}

fn init_api(cli: &Cli) -> Result<CatalogApi<FsBackend>> {
    let dir = data_dir(cli)?;
    let store = FsBackend::open(&dir).with_context(|| format!("Opening store at {}", dir.display()))?;
    let config = CatalogConfig::load(&dir).context("Loading catalog.toml")?;
    let catalog = Catalog::new(store).with_config(config);
    Ok(CatalogApi::for_actor_named(catalog, &cli.user)?)
}

fn dispatch(api: &CatalogApi<FsBackend>, command: Commands) -> Result<CmdResult> {
    let result = match command {
        Commands::Schema { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Reading {}", file.display()))?;
            api.load_schema(&SchemaDocument::from_json(&raw)?)?
        }
        Commands::Create {
            entity,
            name,
            attrs,
            set,
        } => api.create_entry(&entity, &name, &attribute_map(attrs.as_deref(), &set)?)?,
        Commands::Update {
            selector,
            rename,
            attrs,
            set,
        } => api.update_entry(
            &selector,
            rename.as_deref(),
            &attribute_map(attrs.as_deref(), &set)?,
        )?,
        Commands::Append {
            selector,
            attr,
            value,
        } => api.append_value(&selector, &attr, &parse_value(&value)?)?,
        Commands::Remove {
            selector,
            attr,
            value,
        } => api.remove_value(&selector, &attr, &parse_value(&value)?)?,
        Commands::View {
            selectors,
            metadata,
        } => api.view_entries(&selectors, metadata)?,
        Commands::Export { selectors } => api.export_entries(&selectors)?,
        Commands::Copy { source, names } => api.copy_entry(&source, &names)?,
        Commands::Delete { selectors } => api.delete_entries(&selectors)?,
        Commands::Restore { selectors } => api.restore_entries(&selectors)?,
        Commands::Purge { selectors } => api.purge_entries(&selectors)?,
        Commands::History {
            selector,
            count,
            offset,
        } => api.history(&selector, count, offset)?,
        Commands::Referrers {
            selector,
            entity,
            exclude,
            keyword,
        } => api.referrers(&selector, &entity, &exclude, keyword.as_deref())?,
        Commands::Candidates { attr_id, keyword } => {
            api.referral_candidates(attr_id, keyword.as_deref())?
        }
        Commands::Search {
            entity,
            attr,
            name,
            referral,
            limit,
            all,
        } => {
            api.reindex()?;
            api.search(&SearchArgs {
                entities: entity,
                hints: attr,
                entry_name: name,
                referral,
                limit,
                output_all: all,
            })?
        }
        Commands::Find {
            keyword,
            exclude,
            limit,
            offset,
        } => {
            api.reindex()?;
            api.search_simple(&keyword, &exclude, limit, offset)?
        }
        Commands::Reindex => api.reindex()?,
    };
    Ok(result)
}

/// Merge `--attrs` and `--set` into one attribute map; `--set` wins.
fn attribute_map(attrs: Option<&str>, set: &[String]) -> Result<Map<String, Json>> {
    let mut map = match attrs {
        Some(raw) => match serde_json::from_str::<Json>(raw).context("Parsing --attrs")? {
            Json::Object(map) => map,
            other => bail!("--attrs must be a JSON object, got {}", other),
        },
        None => Map::new(),
    };
    for pair in set {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("--set expects NAME=VALUE, got '{}'", pair);
        };
        map.insert(name.trim().to_string(), parse_value(value)?);
    }
    Ok(map)
}

fn parse_value(raw: &str) -> Result<Json> {
    let trimmed = raw.trim();
    let looks_like_json = trimmed.starts_with(['[', '{', '"'])
        || matches!(trimmed, "true" | "false" | "null");
    if looks_like_json {
        serde_json::from_str(trimmed).with_context(|| format!("Parsing value {}", trimmed))
    } else {
        Ok(Json::String(raw.to_string()))
    }
}
