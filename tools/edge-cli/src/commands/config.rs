//! Configuration management commands.

use std::fs;

use anyhow::{bail, Context as _, Result};
use edge_core::EngineConfig;
use url::Url;

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
        ConfigCommand::Init {
            origin,
            version,
            force,
        } => init_config(&origin, &version, force, ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    let config = ctx.require_config()?;

    if ctx.output.is_json() {
        ctx.output.json(config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    if let Some(path) = &ctx.config_path {
        ctx.output.kv("file", &path.display().to_string());
    }

    ctx.output.info("");
    ctx.output.info("[deployment]");
    ctx.output.kv("version", &config.version);
    ctx.output.kv("origin", config.origin.as_str());
    ctx.output.kv("skip_waiting", &config.skip_waiting.to_string());

    ctx.output.info("");
    ctx.output.info("[namespaces]");
    ctx.output.kv("application", &config.app_namespace());
    ctx.output.kv("images", &config.image_namespace);
    let capacity = match config.image_cache_capacity {
        0 => "unbounded".to_string(),
        n => format!("{} entries (LRU)", n),
    };
    ctx.output.kv("image capacity", &capacity);

    ctx.output.info("");
    ctx.output.info("[classification]");
    ctx.output.kv("api_prefix", &config.api_prefix);
    ctx.output.kv("image_path_patterns", &config.image_path_patterns.join(", "));
    if config.trusted_image_hosts.is_empty() {
        ctx.output.kv("trusted_image_hosts", "(none)");
    } else {
        ctx.output.kv("trusted_image_hosts", "");
        for host in &config.trusted_image_hosts {
            ctx.output.list_item(host);
        }
    }
    ctx.output.kv(
        "cache_untrusted_images",
        &config.cache_untrusted_images.to_string(),
    );

    ctx.output.info("");
    ctx.output.info("[precache]");
    for path in &config.precache {
        ctx.output.list_item(path);
    }

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    let Some(path) = &ctx.config_path else {
        bail!("No config file found. Run `edge config init --origin <url>` to create one.");
    };

    let config = EngineConfig::load(path).with_context(|| format!("{} is invalid", path.display()))?;

    if config.trusted_image_hosts.is_empty() {
        ctx.output
            .warn("No trusted image hosts: external images will not be cached");
    }
    if config.precache.is_empty() {
        ctx.output
            .warn("Empty precache manifest: offline navigation has no root fallback");
    } else if !config.precache.iter().any(|p| p == "/") {
        ctx.output
            .warn("Precache manifest lacks \"/\": offline navigation has no root fallback");
    }

    ctx.output
        .success(&format!("{} is valid", path.display()));
    Ok(())
}

async fn init_config(origin: &str, version: &str, force: bool, ctx: &Context) -> Result<()> {
    let origin = Url::parse(origin).with_context(|| format!("Invalid origin: {}", origin))?;
    let path = ctx.resolve_path("edge.toml");

    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    let content = generate_default_config(version, origin.as_str().trim_end_matches('/'));
    EngineConfig::from_toml_str(&content).context("Generated config is invalid")?;

    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    ctx.output
        .success(&format!("Created {}", path.display()));
    Ok(())
}
