use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use rollout_core::cache::open_cache;

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// Forget run-once records so those actions run again
    Clear {
        /// Remove a single key (action id followed by target identity)
        #[arg(long)]
        key: Option<String>,

        /// Operate on an in-memory store instead of the per-user cache file
        #[arg(long)]
        no_cache: bool,
    },
}

pub fn run(subcmd: CacheSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CacheSubcommand::Clear { key, no_cache } => clear(key.as_deref(), no_cache, json),
    }
}

fn clear(key: Option<&str>, no_cache: bool, json: bool) -> anyhow::Result<()> {
    let mut cache = open_cache(no_cache).context("failed to open run-once cache")?;
    cache.clear(key).context("failed to clear cache")?;
    cache.flush().context("failed to flush cache")?;

    if json {
        return print_json(&serde_json::json!({ "cleared": key.unwrap_or("*") }));
    }
    match key {
        Some(k) => println!("Cleared cache key '{k}'."),
        None => println!("Cleared run-once cache."),
    }
    Ok(())
}
