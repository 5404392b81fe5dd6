//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use offline_router::RouteTable;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{find_config_file, generate_default_config};
use crate::context::Context;

/// Longest fetch timeout that does not trigger a warning.
const SLOW_TIMEOUT_MS: u64 = 30_000;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    if ctx.output.is_json() {
        ctx.output.json(config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    ctx.output.kv("origin", &config.origin);
    ctx.output.kv("generation", config.generation.as_str());
    ctx.output.kv("root_document", &config.root_document);
    ctx.output.kv("asset_prefix", &config.asset_prefix);
    ctx.output.kv("fetch_timeout_ms", &config.fetch_timeout_ms.to_string());
    ctx.output.kv("debug_headers", &config.debug_headers.to_string());
    ctx.output.kv("log_format", &format!("{:?}", config.log_format).to_lowercase());

    ctx.output.header("Seed");
    for url in &config.seed {
        ctx.output.list_item(url);
    }

    ctx.output.header("Trusted hosts");
    for host in &config.trusted_hosts {
        ctx.output.list_item(host);
    }

    ctx.output.header("Critical stylesheets");
    for sheet in &config.critical_stylesheets {
        ctx.output.list_item(sheet);
    }

    if !config.aliases.is_empty() {
        ctx.output.header("Aliases");
        for alias in &config.aliases {
            ctx.output.kv(&alias.canonical, &alias.variants.join(", "));
        }
    }

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let config = &ctx.config;
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if let Err(e) = config.validate() {
        errors.push(e.to_string());
    }

    if let Err(e) = RouteTable::from_config(config) {
        errors.push(e.to_string());
    }

    if config.fetch_timeout_ms > SLOW_TIMEOUT_MS {
        warnings.push(format!(
            "fetch_timeout_ms is {}; navigations will hang that long before the offline fallback",
            config.fetch_timeout_ms
        ));
    }

    if config.debug_headers {
        warnings.push("debug_headers is enabled for every response".to_string());
    }

    if let Ok(seed) = config.seed_urls() {
        for sheet in &config.critical_stylesheets {
            if let Ok(url) = config.resolve(sheet) {
                if !seed.contains(&url) {
                    warnings.push(format!(
                        "critical stylesheet {} is not seeded and has no offline copy until first load",
                        sheet
                    ));
                }
            }
        }
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "valid": errors.is_empty(),
            "errors": errors,
            "warnings": warnings,
        }));
        if !errors.is_empty() {
            bail!("Configuration has {} error(s)", errors.len());
        }
        return Ok(());
    }

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    if let Some(existing) = find_config_file(&ctx.cwd) {
        if !force {
            bail!(
                "Config file already exists: {}. Use --force to overwrite.",
                existing.display()
            );
        }
    }

    let config_path = ctx.cwd.join("offline.toml");
    fs::write(&config_path, generate_default_config()?)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}
