//! Deploy against the live network and route URLs through the engine.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use edge_cache::MemoryCacheStorage;
use edge_core::{Request, ResponseSource};
use edge_data::HttpNetwork;
use edge_worker::{DeployOutcome, Registration};
use serde::Serialize;
use tracing::{debug, info};

use super::RunArgs;
use crate::context::Context;
use crate::output::source_badge;

#[derive(Serialize)]
struct Row {
    pass: usize,
    url: String,
    classification: Option<String>,
    source: ResponseSource,
    status: Option<u16>,
    bytes: Option<usize>,
    error: Option<String>,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.require_config()?.clone();
    if let Some(version) = args.version {
        config.version = version;
    }

    let urls = args
        .urls
        .iter()
        .map(|input| ctx.resolve_url(input))
        .collect::<Result<Vec<_>>>()?;

    let registration = Registration::new(
        Arc::new(MemoryCacheStorage::new()),
        Arc::new(HttpNetwork::new()),
    );

    let spinner = ctx.output.spinner(&format!(
        "Installing {} ({} precache entries)",
        config.version,
        config.precache.len()
    ));
    let outcome = registration.deploy(config.clone()).await;
    spinner.finish_and_clear();
    info!(version = %config.version, ok = outcome.is_ok(), "deployment finished");

    match outcome.with_context(|| format!("Deployment of {} failed", config.version))? {
        DeployOutcome::Activated(report) => {
            ctx.output.success(&format!("Activated {}", report.version));
            for name in &report.purged {
                ctx.output.debug(&format!("purged {}", name));
            }
        }
        DeployOutcome::Waiting { version } => {
            let report = registration
                .promote_waiting()
                .await?
                .with_context(|| format!("{} is installed but could not activate", version))?;
            ctx.output.success(&format!("Activated {} after waiting", report.version));
        }
    }

    let passes = args.passes.max(1);
    let progress = ctx
        .output
        .progress((passes * urls.len()) as u64, "Routing requests");
    let mut rows = Vec::new();

    for pass in 1..=passes {
        for url in &urls {
            let request = if args.navigate {
                Request::navigate(url.clone())
            } else {
                Request::get(url.clone())
            };

            let mut handled = registration.handle_fetch(&request).await;
            handled.settle().await;

            let classification = handled.classification().map(|c| c.to_string());
            let source = handled.source();
            debug!(pass, url = %url, source = %source, "request routed");
            let (status, bytes, error) = match handled.into_outcome() {
                Ok(response) => (Some(response.status().as_u16()), Some(response.body().len()), None),
                Err(err) => (None, None, Some(err.to_string())),
            };

            rows.push(Row {
                pass,
                url: url.to_string(),
                classification,
                source,
                status,
                bytes,
                error,
            });
            progress.inc(1);
        }
    }
    progress.finish_and_clear();

    let snapshot = registration.metrics().snapshot();

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "requests": rows,
            "metrics": snapshot,
        }));
        return Ok(());
    }

    ctx.output.header("Requests");
    ctx.output.table_row(&["PASS", "SOURCE", "STATUS", "CLASS", "URL"], &[4, 11, 6, 22, 0]);
    for row in &rows {
        let status = match (&row.status, &row.error) {
            (Some(code), _) => code.to_string(),
            (None, Some(_)) => "error".to_string(),
            (None, None) => "-".to_string(),
        };
        ctx.output.table_row(
            &[
                &row.pass.to_string(),
                &source_badge(row.source, 11),
                &status,
                row.classification.as_deref().unwrap_or("-"),
                &row.url,
            ],
            &[4, 11, 6, 22, 0],
        );
        if let Some(error) = &row.error {
            ctx.output.debug(error);
        }
    }

    ctx.output.header("Metrics");
    for (source, count) in &snapshot.served {
        ctx.output.kv(source, &count.to_string());
    }
    ctx.output.kv("cache writes", &snapshot.cache_writes.to_string());
    ctx.output
        .kv("failed cache writes", &snapshot.cache_write_failures.to_string());
    ctx.output
        .kv("cache ratio", &format!("{:.0}%", snapshot.cache_ratio() * 100.0));

    Ok(())
}
