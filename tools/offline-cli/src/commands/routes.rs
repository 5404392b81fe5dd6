//! Route inspection.

use anyhow::{Context as _, Result};
use offline_core::Request;
use offline_router::RouteTable;
use serde::Serialize;

use super::RoutesArgs;
use crate::context::Context;

#[derive(Serialize)]
struct RouteRow {
    url: String,
    rule: &'static str,
    strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonical: Option<String>,
}

/// Run the routes command.
pub async fn run(args: RoutesArgs, ctx: &Context) -> Result<()> {
    let table = RouteTable::from_config(&ctx.config).context("Failed to build route table")?;

    if args.table {
        return print_table(&table, ctx);
    }

    let mut rows = Vec::with_capacity(args.urls.len());
    for raw in &args.urls {
        let url = ctx
            .config
            .resolve(raw)
            .with_context(|| format!("Invalid URL: {}", raw))?;
        let request = if args.html {
            Request::navigate(url)
        } else {
            Request::get(url)
        };

        let decision = table.route(&request);
        rows.push(RouteRow {
            url: request.url().to_string(),
            rule: decision.rule,
            strategy: decision.strategy.to_string(),
            canonical: decision.canonical.map(|c| c.to_string()),
        });
    }

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    ctx.output.header("Routes");
    let width = rows.iter().map(|r| r.url.len()).max().unwrap_or(0);
    for row in &rows {
        ctx.output
            .route(&row.url, row.rule, &row.strategy, row.canonical.as_deref(), width);
    }

    Ok(())
}

fn print_table(table: &RouteTable, ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        let rules: Vec<_> = table
            .rules()
            .iter()
            .map(|rule| {
                serde_json::json!({
                    "rule": rule.name,
                    "matcher": rule.matcher.to_string(),
                    "strategy": rule.strategy,
                })
            })
            .collect();
        ctx.output.json(&rules);
        return Ok(());
    }

    ctx.output.header(&format!("Rule table for {}", table.origin()));
    for (i, rule) in table.rules().iter().enumerate() {
        ctx.output.rule(
            i + 1,
            rule.name,
            &rule.strategy.to_string(),
            &rule.matcher.to_string(),
        );
    }

    Ok(())
}
