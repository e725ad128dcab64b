//! Search and list command handlers.
//!
//! Each command starts the agents, runs one request through the typed service,
//! prints the response as pretty JSON and shuts the agents down again.

use anyhow::{Context, Result};
use serde::Serialize;

use gamestore_bridge::config::Config;
use gamestore_bridge::gateway::Source;
use gamestore_bridge::service::{GameStoreRuntime, SearchOutcome};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode response")?;
    println!("{}", json);
    Ok(())
}

/// Search a title and print the outcome.
pub(crate) async fn cmd_search(config: &Config, title: &str) -> Result<()> {
    let runtime = GameStoreRuntime::start(config).context("Failed to start agents")?;
    let outcome = runtime.service().search(title).await;
    runtime.shutdown().await;

    let outcome = outcome.with_context(|| format!("Search for '{}' failed", title))?;
    if matches!(outcome, SearchOutcome::NotFound) {
        eprintln!("No game matching '{}'", title);
    }
    print_json(&outcome)
}

/// List one or both sources and print the response.
pub(crate) async fn cmd_list(config: &Config, source: Source) -> Result<()> {
    let runtime = GameStoreRuntime::start(config).context("Failed to start agents")?;
    let result = match source {
        Source::Both => match runtime.service().list_both().await {
            Ok(combined) => print_json(&combined),
            Err(e) => Err(e.into()),
        },
        single => match runtime.service().list(single).await {
            Ok(list) => print_json(&list),
            Err(e) => Err(e.into()),
        },
    };
    runtime.shutdown().await;
    result.with_context(|| format!("Listing {} games failed", source))
}
