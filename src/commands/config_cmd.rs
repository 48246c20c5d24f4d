//! Configuration management commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use promise_tree::config::Config;

fn target_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::global_path(),
    }
}

/// Show the effective configuration
pub fn show(path: Option<&Path>, json: bool) -> Result<()> {
    let config = Config::load_or_default(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let source = target_path(path)?;
    println!("# {}", source.display());
    if !source.exists() {
        println!("# (not present, showing defaults)");
    }
    print!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );
    Ok(())
}

/// Write a default config file
pub fn init(path: Option<&Path>) -> Result<()> {
    let target = target_path(path)?;
    if target.exists() {
        println!("Configuration already exists at {}", target.display());
        return Ok(());
    }
    Config::default().save(&target)?;
    println!("Created default configuration at {}", target.display());
    Ok(())
}
