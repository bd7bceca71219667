//! Config file discovery and templates.

use std::path::{Path, PathBuf};

/// File names searched, in order, in each directory.
pub const CONFIG_NAMES: [&str; 3] = ["edge.toml", ".edge.toml", "edge.json"];

/// Find a config file in `start` or any parent directory.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in &CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Generate a default `edge.toml`.
pub fn generate_default_config(version: &str, origin: &str) -> String {
    format!(
        r#"# Edge interception engine configuration

version = "{version}"
origin = "{origin}"

# Static assets stored at install time
precache = ["/", "/manifest.json"]

# External image hosts cached like local images (exact or *.suffix)
trusted_image_hosts = []

# LRU entry cap for the image namespace (0 = unbounded)
image_cache_capacity = 500

skip_waiting = true
explain_headers = false

[notification]
title = "Explore new destinations"
default_body = "You have a new update"
"#,
        version = version,
        origin = origin
    )
}
