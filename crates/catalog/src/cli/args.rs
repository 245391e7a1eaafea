use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "catalog", version, disable_help_subcommand = true)]
#[command(about = "Versioned attribute-value catalog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding catalog.json and catalog.toml
    #[arg(long, env = "CATALOG_HOME", global = true, help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Acting user (registered on first use)
    #[arg(short, long, env = "CATALOG_USER", default_value = "admin", global = true, help_heading = "Options")]
    pub user: String,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, help_heading = "Options")]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load or reload a schema document (JSON)
    Schema {
        /// Path to the schema document
        file: PathBuf,
    },

    /// Create an entry
    #[command(alias = "n")]
    Create {
        /// Entity name
        entity: String,
        /// Entry name
        name: String,
        /// Attribute values as a JSON object
        #[arg(long)]
        attrs: Option<String>,
        /// One attribute value as name=value (value may be JSON)
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },

    /// Rename an entry or write attribute values
    #[command(alias = "u")]
    Update {
        /// Entry id (#42) or Entity/name
        selector: String,
        /// New entry name
        #[arg(long)]
        rename: Option<String>,
        /// Attribute values as a JSON object
        #[arg(long)]
        attrs: Option<String>,
        /// One attribute value as name=value (value may be JSON)
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },

    /// Append an element to an array attribute
    Append {
        selector: String,
        attr: String,
        /// Element (JSON, or a plain string)
        value: String,
    },

    /// Remove matching elements from an array attribute
    Remove {
        selector: String,
        attr: String,
        /// Element (JSON, or a plain string)
        value: String,
    },

    /// Show entries
    #[command(alias = "v")]
    View {
        #[arg(required = true, num_args = 1..)]
        selectors: Vec<String>,
        /// Include ids of attributes and referents
        #[arg(long)]
        metadata: bool,
    },

    /// Export entries as portable JSON
    Export {
        #[arg(required = true, num_args = 1..)]
        selectors: Vec<String>,
    },

    /// Copy an entry under new names
    #[command(alias = "cp")]
    Copy {
        source: String,
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,
    },

    /// Soft-delete entries
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true, num_args = 1..)]
        selectors: Vec<String>,
    },

    /// Restore soft-deleted entries
    Restore {
        #[arg(required = true, num_args = 1..)]
        selectors: Vec<String>,
    },

    /// Permanently remove soft-deleted entries
    Purge {
        #[arg(required = true, num_args = 1..)]
        selectors: Vec<String>,
    },

    /// Show the value history of an entry
    History {
        selector: String,
        #[arg(long)]
        count: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// List entries referring to an entry
    Referrers {
        selector: String,
        /// Only referrers of this entity (repeatable)
        #[arg(short, long)]
        entity: Vec<String>,
        /// Skip referrers of this entity (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(short, long)]
        keyword: Option<String>,
    },

    /// List what a reference attribute may point at
    Candidates {
        /// Attribute or schema attribute id
        attr_id: u64,
        #[arg(short, long)]
        keyword: Option<String>,
    },

    /// Faceted search
    #[command(alias = "s")]
    Search {
        /// Entity to search (repeatable, default all)
        #[arg(short, long)]
        entity: Vec<String>,
        /// Attribute hint: name, name=keyword or name==exact (repeatable)
        #[arg(short, long)]
        attr: Vec<String>,
        /// Entry name keyword
        #[arg(short, long, default_value = "")]
        name: String,
        /// Only entries with a live referrer ("*") or one matching this name
        #[arg(long)]
        referral: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
        /// Show every readable attribute, not only hinted ones
        #[arg(long)]
        all: bool,
    },

    /// Keyword search over names and values
    #[command(alias = "f")]
    Find {
        keyword: String,
        /// Skip entries of this entity (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Rebuild the search index
    Reindex,
}
