//! Classification preview.

use anyhow::{Context as _, Result};
use edge_core::Request;
use edge_executor::{Classification, Classifier, NamespaceKind, Strategy};
use http::Method;
use serde::Serialize;

use super::ClassifyArgs;
use crate::context::Context;
use crate::output::classification_badge;

#[derive(Serialize)]
struct Row {
    url: String,
    classification: Option<Classification>,
    intercepted: bool,
    strategy: Option<Strategy>,
}

/// Run the classify command.
pub async fn run(args: ClassifyArgs, ctx: &Context) -> Result<()> {
    let config = ctx.require_config()?;
    let classifier = Classifier::from_config(config);
    let method: Method = args
        .method
        .to_uppercase()
        .parse()
        .with_context(|| format!("Invalid method: {}", args.method))?;

    let mut rows = Vec::with_capacity(args.urls.len());
    for input in &args.urls {
        let url = ctx.resolve_url(input)?;
        let request = Request::new(method.clone(), url)
            .with_mode(args.mode)
            .with_destination(args.destination);

        let classification = classifier.classify(&request);
        rows.push(Row {
            url: request.url.to_string(),
            classification,
            intercepted: classification.is_some_and(|c| c.is_intercepted()),
            strategy: classification.map(Strategy::for_classification),
        });
    }

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    ctx.output.header("Classification");
    for row in &rows {
        ctx.output.info(&row.url);
        match (row.classification, row.strategy) {
            (Some(classification), Some(strategy)) => {
                ctx.output.kv("class", &classification_badge(&classification.to_string()));
                ctx.output.kv("strategy", &strategy.to_string());
                if let Some(namespace) = strategy.namespace() {
                    let name = match namespace {
                        NamespaceKind::App => config.app_namespace(),
                        NamespaceKind::Image => config.image_namespace.clone(),
                    };
                    ctx.output.kv("namespace", &name);
                }
                ctx.output.kv("on failure", &strategy.fallback().to_string());
                ctx.output.kv("write-back", &strategy.write_back().to_string());
            }
            _ => ctx.output.kv("class", "ignored (non-GET, passes through)"),
        }
    }

    Ok(())
}
