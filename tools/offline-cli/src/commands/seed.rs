//! Seed list inspection.

use anyhow::Result;
use serde::Serialize;

use super::SeedArgs;
use crate::context::Context;

#[derive(Serialize)]
struct SeedReport {
    generation: String,
    root_document: String,
    urls: Vec<String>,
}

/// Run the seed command.
pub async fn run(args: SeedArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    if args.generation_only {
        if ctx.output.is_json() {
            ctx.output.json(&serde_json::json!({ "generation": config.generation }));
        } else {
            println!("{}", config.generation);
        }
        return Ok(());
    }

    let report = SeedReport {
        generation: config.generation.to_string(),
        root_document: config.root_url()?.to_string(),
        urls: config.seed_urls()?.iter().map(|u| u.to_string()).collect(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header("Seed");
    ctx.output.kv("generation", &report.generation);
    ctx.output.kv("root document", &report.root_document);
    ctx.output.kv("entries", &report.urls.len().to_string());
    for url in &report.urls {
        ctx.output.list_item(url);
    }

    Ok(())
}
