mod cli;
mod commands;
mod output;

use anyhow::{Result, anyhow};
use clap::Parser;

use cli::{Cli, Commands, OutputFormat};
use octocache_client::config::loader::load_config;
use octocache_client::observability::init_tracing_with_level;
use octocache_client::{CacheClient, create_cache_client};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    let config = load_config(cli.config.as_deref()).map_err(|e| anyhow!(e))?;
    init_tracing_with_level(&config.logging.level);

    let client = create_cache_client(&config).await?;
    let result = execute(&client, &cli.command, format).await;
    client.close().await;
    result
}

async fn execute(client: &CacheClient, command: &Commands, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Get(args) => commands::get(client, &args.key, format).await,
        Commands::Set(args) => {
            commands::set(client, &args.key, &args.value, args.ttl, format).await
        }
        Commands::Keys(args) | Commands::Scan(args) => {
            commands::keys(client, &args.pattern, format).await
        }
        Commands::Clear(args) => commands::clear(client, &args.pattern, format).await,
        Commands::Del(args) => commands::del(client, &args.ids).await,
        Commands::Dbsize => commands::dbsize(client, format).await,
    }
}
