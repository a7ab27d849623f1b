//! CLI command implementations

pub mod accounts;
pub mod connections;
pub mod consent;
pub mod payment;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use multibank_core::AggregatorContext;

/// Data directory from `MULTIBANK_DIR` or `~/.multibank`
pub fn get_data_dir() -> PathBuf {
    multibank_core::config::default_dir()
}

/// Build the aggregator context from the data directory
pub fn get_context() -> Result<AggregatorContext> {
    let data_dir = get_data_dir();
    AggregatorContext::new(&data_dir).with_context(|| {
        format!(
            "Failed to initialize multibank context in {}",
            data_dir.display()
        )
    })
}

/// Read and parse a JSON file given on the command line
pub fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
