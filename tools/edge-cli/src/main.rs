//! Edge CLI - Operator tool for the edge request-interception engine.
//!
//! Commands:
//! - `edge config` - Show, validate or create the engine configuration
//! - `edge classify` - Show how URLs are classified and which strategy runs
//! - `edge run` - Deploy against the live network and route URLs through the engine
//! - `edge notify` - Preview the notification a push payload produces

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edge_observability::{init_tracing, LogFormat};

use commands::{ClassifyArgs, ConfigArgs, NotifyArgs, RunArgs};

/// Edge CLI - Inspect and exercise the edge request-interception engine
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log format (human or json)
    #[arg(long, global = true, default_value = "human")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(ConfigArgs),

    /// Classify URLs and show the strategy for each
    Classify(ClassifyArgs),

    /// Deploy and route URLs through the engine
    Run(RunArgs),

    /// Preview a push notification
    Notify(NotifyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    if let Err(e) = init_tracing(cli.log_format, filter) {
        eprintln!("logging disabled: {}", e);
    }

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let result = match cli.command {
        Commands::Config(args) => commands::config::run(args, &ctx).await,
        Commands::Classify(args) => commands::classify::run(args, &ctx).await,
        Commands::Run(args) => commands::run::run(args, &ctx).await,
        Commands::Notify(args) => commands::notify::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
