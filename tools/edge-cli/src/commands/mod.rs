//! CLI command implementations.

pub mod classify;
pub mod config;
pub mod notify;
pub mod run;

use clap::{Args, Subcommand};
use edge_core::{Destination, RequestMode};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Validate the config file.
    Validate,
    /// Initialize a new config file.
    Init {
        /// Application origin.
        #[arg(long)]
        origin: String,

        /// Deployment version.
        #[arg(long, default_value = "v1")]
        version: String,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Absolute or origin-relative URLs.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Request mode (navigate, same-origin, no-cors, cors).
    #[arg(long, default_value = "cors")]
    pub mode: RequestMode,

    /// Declared destination (document, image, script, style, ...).
    #[arg(long, default_value = "empty")]
    pub destination: Destination,
}

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Absolute or origin-relative URLs to route.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// How many times to route the URL list.
    #[arg(short, long, default_value = "2")]
    pub passes: usize,

    /// Treat every URL as a navigation.
    #[arg(long)]
    pub navigate: bool,

    /// Override the deployment version.
    #[arg(long)]
    pub version: Option<String>,
}

/// Arguments for the notify command.
#[derive(Args)]
pub struct NotifyArgs {
    /// Push payload text (empty uses the default body).
    pub payload: Option<String>,

    /// Simulate a click on the shown notification.
    #[arg(long)]
    pub click: Option<String>,
}
