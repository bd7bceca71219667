//! CLI execution context.

use std::path::PathBuf;

use anyhow::{anyhow, Context as _, Result};
use edge_core::EngineConfig;
use url::Url;

use crate::config::find_config_file;
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Engine configuration, if a config file was found.
    pub config: Option<EngineConfig>,
    /// Where the configuration was loaded from.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context, reading the config from `config_path` or the nearest
    /// config file up the directory tree.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let path = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => find_config_file(&cwd),
        };

        let config = match &path {
            Some(path) => Some(
                EngineConfig::load(path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
            ),
            None => None,
        };

        Ok(Self {
            config,
            config_path: path,
            output,
            cwd,
        })
    }

    /// The engine configuration, or an error telling the user how to create one.
    pub fn require_config(&self) -> Result<&EngineConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| anyhow!("No config file found. Run `edge config init --origin <url>` to create one."))
    }

    /// Resolve a URL argument: absolute URLs as-is, paths against the origin.
    pub fn resolve_url(&self, input: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(input) {
            return Ok(url);
        }
        let config = self.require_config()?;
        config
            .resolve(input)
            .with_context(|| format!("Invalid URL: {}", input))
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if PathBuf::from(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }
}
