use crate::output::print_json;
use crate::setup;
use clap::Subcommand;
use pulse_core::workspace;
use std::path::Path;

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// Drop the cached pipeline and repository lists for the workspace
    Clear,
}

pub fn run(config: Option<&Path>, subcmd: CacheSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CacheSubcommand::Clear => clear(config, json),
    }
}

fn clear(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (_, config) = setup::load_config(config)?;
    let cache = setup::open_cache(&config, false)?;
    let ws = config.workspace.id.as_str();

    workspace::invalidate(cache.as_ref(), ws);

    if json {
        print_json(&serde_json::json!({ "workspace": ws, "cleared": true }))?;
    } else {
        println!("Cleared cached workspace data for {ws}.");
    }
    Ok(())
}
