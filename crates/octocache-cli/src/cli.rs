use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "octocache")]
#[command(about = "octocache CLI: read, write and search an indirect cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (overrides OCTOCACHE_CONFIG, defaults to ./octocache.toml)
    #[arg(short, long, global = true, env = "OCTOCACHE_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read the value stored under a key
    Get(KeyArgs),
    /// Store a value and print its identifier
    Set(SetArgs),
    /// List identifiers whose key matches a glob pattern
    Keys(PatternArgs),
    /// Same as `keys`
    Scan(PatternArgs),
    /// Delete every payload whose key matches a glob pattern
    Clear(PatternArgs),
    /// Delete payloads by identifier
    Del(DelArgs),
    /// Number of entries in the mapping cache
    Dbsize,
}

#[derive(clap::Args)]
pub struct KeyArgs {
    /// Logical key
    pub key: String,
}

#[derive(clap::Args)]
pub struct SetArgs {
    /// Logical key
    pub key: String,
    /// Value to store
    pub value: String,
    /// Time to live in seconds (defaults to cache.default_ttl_secs)
    #[arg(long)]
    pub ttl: Option<u64>,
}

#[derive(clap::Args)]
pub struct PatternArgs {
    /// Glob pattern, e.g. "user:*"
    pub pattern: String,
}

#[derive(clap::Args)]
pub struct DelArgs {
    /// Identifiers to delete
    #[arg(required = true)]
    pub ids: Vec<String>,
}
