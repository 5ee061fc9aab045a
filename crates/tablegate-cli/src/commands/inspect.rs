//! Schema commands: `tables`, `describe`, `relationships`, `summary`.

use super::{Gateway, print_result};
use anyhow::Result;
use std::process::ExitCode;
use tablegate_mcp::ContextInjector;

pub async fn tables(gateway: &Gateway) -> Result<ExitCode> {
    print_result(&gateway.router.list_db_tables().await)
}

pub async fn describe(gateway: &Gateway, table: &str) -> Result<ExitCode> {
    print_result(&gateway.router.describe_db_table(table).await)
}

pub async fn relationships(gateway: &Gateway, table: Option<&str>) -> Result<ExitCode> {
    print_result(&gateway.router.get_db_relationships(table).await)
}

/// Print the schema summary an agent session would receive.
pub async fn summary(
    gateway: &Gateway,
    agent: Option<&str>,
    max_tables: Option<usize>,
) -> Result<ExitCode> {
    let mut config = gateway.config.context.clone();
    if let Some(max) = max_tables {
        config.max_tables = max;
    }
    let injector = ContextInjector::new(gateway.introspector.clone(), config);

    let summary = match agent {
        Some(agent) => injector.summary_for_agent(agent).await,
        None => injector.build_schema_summary().await,
    };
    if summary.is_empty() {
        eprintln!("No schema summary could be built");
        return Ok(ExitCode::FAILURE);
    }
    println!("{}", summary);
    Ok(ExitCode::SUCCESS)
}
